//! The kernel: registry + event queue + the virtual-time driver.
//!
//! Exactly one logical simulation thread drives time: `advance_to`
//! takes `&mut self`, so the type system enforces the single-driver
//! model. Posting and cancellation are `&self` and also available to
//! foreign threads through a cloned [`Poster`] handle (an I/O
//! completion thread posting "data arrived" back into the simulation).
//!
//! Dispatch never holds either internal lock: each due record is popped
//! under the queue lock, its target is loaned out of the registry, and
//! the payload then runs unlocked with a [`Dispatch`] context for
//! re-entrant posting, cancellation, and lookup.

use std::sync::Arc;

use knell_core::{ConfigError, EntityId, PostError, SequenceId, Ticks, VirtualTime};
use knell_registry::Registry;

use crate::config::KernelConfig;
use crate::metrics::KernelMetrics;
use crate::payload::EventPayload;
use crate::queue::EventQueue;

/// Outcome of one `advance_to`/`advance_by` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdvanceResult {
    /// Records delivered to a live target.
    pub dispatched: u64,
    /// Records dropped because their target died after posting.
    pub discarded: u64,
}

fn post_boxed(
    registry: &Registry,
    queue: &EventQueue,
    target: EntityId,
    due: VirtualTime,
    payload: Box<dyn EventPayload>,
) -> Result<SequenceId, PostError> {
    // Best-effort: the target can still die before its due time, so
    // dispatch re-checks through the registry.
    if !registry.contains(target) {
        return Err(PostError::UnknownTarget(target));
    }
    Ok(queue.post(target, due, payload))
}

fn post_in_boxed(
    registry: &Registry,
    queue: &EventQueue,
    target: EntityId,
    delay: Ticks,
    payload: Box<dyn EventPayload>,
) -> Result<SequenceId, PostError> {
    if !registry.contains(target) {
        return Err(PostError::UnknownTarget(target));
    }
    Ok(queue.post_in(target, delay, payload))
}

/// The simulation kernel.
///
/// Owns the entity registry and the event queue. Construct one per
/// simulation and pass it (or handles from it) to every subsystem that
/// needs to post events or resolve entities; there is no process-wide
/// instance.
pub struct Kernel {
    registry: Arc<Registry>,
    queue: Arc<EventQueue>,
}

impl Kernel {
    /// Build a kernel from a validated configuration.
    pub fn new(config: KernelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = Arc::new(Registry::new(config.registry)?);
        let queue = Arc::new(EventQueue::new(config.start_time, config.first_sequence));
        Ok(Self { registry, queue })
    }

    /// The entity registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A cloneable, thread-safe handle for posting from other threads.
    pub fn poster(&self) -> Poster {
        Poster {
            registry: Arc::clone(&self.registry),
            queue: Arc::clone(&self.queue),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.queue.now()
    }

    /// Target of the advance in progress (or of the last one).
    pub fn target_time(&self) -> VirtualTime {
        self.queue.target_time()
    }

    /// Number of pending records.
    pub fn pending(&self) -> usize {
        self.queue.pending_len()
    }

    /// Whether nothing is pending.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Snapshot of the kernel counters.
    pub fn metrics(&self) -> KernelMetrics {
        self.queue.metrics()
    }

    /// Schedule `payload` against `target` at absolute time `due`.
    ///
    /// `due` may equal the current time ("run at the next possible
    /// instant"). The returned sequence id is the cancellation and
    /// introspection handle.
    ///
    /// # Panics
    ///
    /// Panics if `due` is before the current virtual time.
    pub fn post<P>(&self, target: EntityId, due: VirtualTime, payload: P) -> Result<SequenceId, PostError>
    where
        P: EventPayload + 'static,
    {
        post_boxed(&self.registry, &self.queue, target, due, Box::new(payload))
    }

    /// Schedule `payload` against `target` after `delay` ticks.
    pub fn post_in<P>(
        &self,
        target: EntityId,
        delay: Ticks,
        payload: P,
    ) -> Result<SequenceId, PostError>
    where
        P: EventPayload + 'static,
    {
        post_in_boxed(&self.registry, &self.queue, target, delay, Box::new(payload))
    }

    /// Cancel a pending record. `false` if it already fired or was
    /// already canceled.
    pub fn cancel(&self, seq: SequenceId) -> bool {
        self.queue.cancel(seq)
    }

    /// Cancel every pending record targeting `target`.
    pub fn cancel_all_for(&self, target: EntityId) -> usize {
        self.queue.cancel_all_for(target)
    }

    /// Whether the record is still pending.
    pub fn is_pending(&self, seq: SequenceId) -> bool {
        self.queue.is_pending(seq)
    }

    /// Ticks until the record dispatches.
    pub fn time_until(&self, seq: SequenceId) -> Option<Ticks> {
        self.queue.time_until(seq)
    }

    /// Ticks between the record's post and due times.
    pub fn scheduled_span(&self, seq: SequenceId) -> Option<Ticks> {
        self.queue.scheduled_span(seq)
    }

    /// Ticks since the record was posted.
    pub fn elapsed_since_post(&self, seq: SequenceId) -> Option<Ticks> {
        self.queue.elapsed_since_post(seq)
    }

    /// Remove an entity (and recursively its children) and cancel every
    /// pending record against each destroyed id. Returns the number of
    /// records canceled.
    ///
    /// This is the mandatory teardown path: an entity must leave both
    /// the registry and the queue before its storage is freed.
    pub fn remove_entity(&self, id: EntityId) -> usize {
        let destroyed = self.registry.remove(id);
        destroyed
            .iter()
            .map(|&dead| self.queue.cancel_all_for(dead))
            .sum()
    }

    /// Drop all pending records without dispatching them (shutdown).
    pub fn clear(&self) -> usize {
        self.queue.clear()
    }

    /// Advance the virtual clock to `target`, dispatching every due
    /// record in `(due, seq)` order.
    ///
    /// The clock moves incrementally: it lands on each record's due time
    /// before that record's payload runs, and on exactly `target` once
    /// nothing due remains. A record posted during dispatch with
    /// `due == now` is dispatched within this same call. Records whose
    /// target died after posting are discarded silently; entities
    /// routinely die with events still queued against them.
    ///
    /// # Panics
    ///
    /// Panics if `target` is before the current virtual time.
    pub fn advance_to(&mut self, target: VirtualTime) -> AdvanceResult {
        self.queue.begin_advance(target);
        let mut result = AdvanceResult::default();
        while let Some(record) = self.queue.pop_due(target) {
            let dest = record.target();
            let seq = record.sequence();
            match self.registry.loan(dest) {
                Some(mut loan) => {
                    let mut ctx = Dispatch {
                        registry: &self.registry,
                        queue: &self.queue,
                        target: dest,
                        seq,
                    };
                    record.payload.deliver(loan.entity_mut(), &mut ctx);
                    drop(loan);
                    self.queue.note_dispatch(false);
                    result.dispatched += 1;
                }
                None => {
                    self.queue.note_dispatch(true);
                    result.discarded += 1;
                }
            }
        }
        self.queue.finish_advance(target);
        result
    }

    /// Advance the clock by `delta` ticks. Sugar for
    /// [`advance_to(now + delta)`](Kernel::advance_to).
    pub fn advance_by(&mut self, delta: Ticks) -> AdvanceResult {
        let target = self.queue.now() + delta;
        self.advance_to(target)
    }
}

/// Thread-safe posting handle.
///
/// Clones share the kernel's registry and queue; every operation here
/// is safe from any thread. A poster cannot drive time; only the
/// kernel's owner can.
#[derive(Clone)]
pub struct Poster {
    registry: Arc<Registry>,
    queue: Arc<EventQueue>,
}

impl Poster {
    /// See [`Kernel::post`].
    ///
    /// # Panics
    ///
    /// Panics if `due` is before the current virtual time. Posting
    /// relative to the clock from a foreign thread is better done with
    /// [`post_in`](Poster::post_in), which reads the clock under the
    /// queue lock.
    pub fn post<P>(&self, target: EntityId, due: VirtualTime, payload: P) -> Result<SequenceId, PostError>
    where
        P: EventPayload + 'static,
    {
        post_boxed(&self.registry, &self.queue, target, due, Box::new(payload))
    }

    /// See [`Kernel::post_in`].
    pub fn post_in<P>(
        &self,
        target: EntityId,
        delay: Ticks,
        payload: P,
    ) -> Result<SequenceId, PostError>
    where
        P: EventPayload + 'static,
    {
        post_in_boxed(&self.registry, &self.queue, target, delay, Box::new(payload))
    }

    /// See [`Kernel::cancel`].
    pub fn cancel(&self, seq: SequenceId) -> bool {
        self.queue.cancel(seq)
    }

    /// See [`Kernel::cancel_all_for`].
    pub fn cancel_all_for(&self, target: EntityId) -> usize {
        self.queue.cancel_all_for(target)
    }

    /// See [`Kernel::is_pending`].
    pub fn is_pending(&self, seq: SequenceId) -> bool {
        self.queue.is_pending(seq)
    }

    /// See [`Kernel::time_until`].
    pub fn time_until(&self, seq: SequenceId) -> Option<Ticks> {
        self.queue.time_until(seq)
    }

    /// See [`Kernel::scheduled_span`].
    pub fn scheduled_span(&self, seq: SequenceId) -> Option<Ticks> {
        self.queue.scheduled_span(seq)
    }

    /// See [`Kernel::elapsed_since_post`].
    pub fn elapsed_since_post(&self, seq: SequenceId) -> Option<Ticks> {
        self.queue.elapsed_since_post(seq)
    }

    /// See [`Kernel::now`].
    pub fn now(&self) -> VirtualTime {
        self.queue.now()
    }

    /// The entity registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Context handed to a payload while it runs.
///
/// Everything here is re-entrant with respect to the dispatch in
/// progress: the queue and registry locks are not held, so a payload
/// may post (including against its own target, at the current instant),
/// cancel, resolve paths, and destroy entities. The one restriction is
/// that the dispatching entity itself is loaned out, so
/// [`Registry::loan`]/[`Registry::with_mut`] on it return `None`; the
/// payload already holds the `&mut` to it.
pub struct Dispatch<'a> {
    registry: &'a Registry,
    queue: &'a EventQueue,
    target: EntityId,
    seq: SequenceId,
}

impl Dispatch<'_> {
    /// Current virtual time: the due time of the record being
    /// dispatched.
    pub fn now(&self) -> VirtualTime {
        self.queue.now()
    }

    /// Id of the entity being delivered to.
    pub fn target(&self) -> EntityId {
        self.target
    }

    /// Sequence id of the record being dispatched.
    pub fn sequence(&self) -> SequenceId {
        self.seq
    }

    /// The entity registry.
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Schedule a further event; `due` may equal [`now`](Dispatch::now),
    /// making it eligible within the advance in progress.
    ///
    /// # Panics
    ///
    /// Panics if `due` is before the current virtual time.
    pub fn post<P>(&mut self, target: EntityId, due: VirtualTime, payload: P) -> Result<SequenceId, PostError>
    where
        P: EventPayload + 'static,
    {
        post_boxed(self.registry, self.queue, target, due, Box::new(payload))
    }

    /// Schedule a further event `delay` ticks from now.
    pub fn post_in<P>(
        &mut self,
        target: EntityId,
        delay: Ticks,
        payload: P,
    ) -> Result<SequenceId, PostError>
    where
        P: EventPayload + 'static,
    {
        post_in_boxed(self.registry, self.queue, target, delay, Box::new(payload))
    }

    /// Cancel a pending record. Cancelling the record currently being
    /// dispatched is a no-op; it already left the queue.
    pub fn cancel(&mut self, seq: SequenceId) -> bool {
        self.queue.cancel(seq)
    }

    /// Cancel every pending record targeting `target`.
    pub fn cancel_all_for(&mut self, target: EntityId) -> usize {
        self.queue.cancel_all_for(target)
    }

    /// Whether a record is still pending.
    pub fn is_pending(&self, seq: SequenceId) -> bool {
        self.queue.is_pending(seq)
    }

    /// Remove an entity (recursively) and cancel its pending records.
    /// Destroying the dispatching entity itself is legal: its storage
    /// is reclaimed when the current delivery returns.
    pub fn destroy(&mut self, id: EntityId) -> usize {
        let destroyed = self.registry.remove(id);
        destroyed
            .iter()
            .map(|&dead| self.queue.cancel_all_for(dead))
            .sum()
    }
}
