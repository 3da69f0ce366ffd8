//! Same-tick chaining: logic that reposts itself for "the next possible
//! instant" must run again before `advance_to` returns.

use std::any::Any;
use std::sync::{Arc, Mutex};

use knell_core::{Entity, EntityId, Ticks, VirtualTime};
use knell_sched::{Dispatch, EventPayload, Kernel, KernelConfig};

struct Chain {
    hops: u32,
}

impl Entity for Chain {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Bumps the counter and reposts itself at the current instant until
/// `remaining` runs out.
struct Hop {
    remaining: u32,
}

impl EventPayload for Hop {
    fn deliver(self: Box<Self>, target: &mut dyn Entity, ctx: &mut Dispatch<'_>) {
        target.downcast_mut::<Chain>().unwrap().hops += 1;
        if self.remaining > 0 {
            let me = ctx.target();
            let now = ctx.now();
            ctx.post(
                me,
                now,
                Hop {
                    remaining: self.remaining - 1,
                },
            )
            .unwrap();
        }
    }
}

fn setup() -> (Kernel, EntityId) {
    let kernel = Kernel::new(KernelConfig::default()).unwrap();
    let id = kernel.registry().register(Box::new(Chain { hops: 0 }));
    (kernel, id)
}

fn hops(kernel: &Kernel, id: EntityId) -> u32 {
    kernel
        .registry()
        .with_mut(id, |c| c.downcast_ref::<Chain>().unwrap().hops)
        .unwrap()
}

#[test]
fn self_repost_at_now_runs_within_the_same_advance() {
    let (mut kernel, e) = setup();
    kernel.post(e, VirtualTime(5), Hop { remaining: 9 }).unwrap();

    let result = kernel.advance_to(VirtualTime(5));
    assert_eq!(result.dispatched, 10);
    assert_eq!(kernel.now(), VirtualTime(5));
    assert!(kernel.is_idle());
    assert_eq!(hops(&kernel, e), 10);
}

#[test]
fn repost_beyond_the_target_stays_pending() {
    let (mut kernel, e) = setup();
    kernel
        .post(
            e,
            VirtualTime(5),
            |target: &mut dyn Entity, ctx: &mut Dispatch<'_>| {
                target.downcast_mut::<Chain>().unwrap().hops += 1;
                let me = ctx.target();
                ctx.post_in(me, Ticks(1), Hop { remaining: 0 }).unwrap();
            },
        )
        .unwrap();

    let result = kernel.advance_to(VirtualTime(5));
    assert_eq!(result.dispatched, 1);
    assert_eq!(kernel.pending(), 1);

    kernel.advance_by(Ticks(1));
    assert!(kernel.is_idle());
    assert_eq!(hops(&kernel, e), 2);
}

#[test]
fn chained_events_interleave_with_other_due_work() {
    // A same-tick repost gets a fresh (larger) sequence number, so an
    // event already queued at the same instant by someone else runs
    // first.
    let (mut kernel, e) = setup();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();

    let log_a = log.clone();
    kernel
        .post(
            e,
            VirtualTime(5),
            move |_: &mut dyn Entity, ctx: &mut Dispatch<'_>| {
                log_a.lock().unwrap().push("first");
                let me = ctx.target();
                let now = ctx.now();
                let log_chained = log_a.clone();
                ctx.post(me, now, move |_: &mut dyn Entity, _: &mut Dispatch<'_>| {
                    log_chained.lock().unwrap().push("chained");
                })
                .unwrap();
            },
        )
        .unwrap();

    let log_b = log.clone();
    kernel
        .post(
            e,
            VirtualTime(5),
            move |_: &mut dyn Entity, _: &mut Dispatch<'_>| {
                log_b.lock().unwrap().push("second");
            },
        )
        .unwrap();

    kernel.advance_to(VirtualTime(5));
    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "chained"]);
}
