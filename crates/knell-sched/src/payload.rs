//! Event payloads.

use knell_core::Entity;

use crate::kernel::Dispatch;

/// The logic a scheduled event runs against its target.
///
/// A payload is consumed by its one delivery: `deliver` takes the box
/// by value. The target is the live entity the event was posted
/// against, re-resolved at dispatch time; `ctx` carries the clock and
/// the posting surface, so a payload may schedule further events
/// (including against its own target, at the current instant) while it
/// runs.
///
/// Any `FnOnce(&mut dyn Entity, &mut Dispatch<'_>) + Send` closure is a
/// payload.
pub trait EventPayload: Send {
    /// Run the payload against its target.
    fn deliver(self: Box<Self>, target: &mut dyn Entity, ctx: &mut Dispatch<'_>);
}

impl<F> EventPayload for F
where
    F: FnOnce(&mut dyn Entity, &mut Dispatch<'_>) + Send,
{
    fn deliver(self: Box<Self>, target: &mut dyn Entity, ctx: &mut Dispatch<'_>) {
        (*self)(target, ctx)
    }
}
