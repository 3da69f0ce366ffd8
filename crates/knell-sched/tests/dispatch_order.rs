//! Dispatch-order guarantees: non-decreasing due times, post-order
//! tie-breaking, and run-to-run determinism.

use std::any::Any;
use std::sync::{Arc, Mutex};

use knell_core::{Entity, EntityId, VirtualTime};
use knell_sched::{Dispatch, Kernel, KernelConfig};

struct Dummy;

impl Entity for Dummy {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn kernel_with_entity() -> (Kernel, EntityId) {
    let kernel = Kernel::new(KernelConfig::default()).unwrap();
    let id = kernel.registry().register(Box::new(Dummy));
    (kernel, id)
}

type Log = Arc<Mutex<Vec<u64>>>;

fn tagged(log: &Log, tag: u64) -> impl FnOnce(&mut dyn Entity, &mut Dispatch<'_>) + Send {
    let log = log.clone();
    move |_, _| log.lock().unwrap().push(tag)
}

#[test]
fn three_event_scenario() {
    // Post for times 10, 10, 5 in that order; expect 5, then the two
    // 10s in posting order.
    let (mut kernel, e) = kernel_with_entity();
    let log: Log = Arc::default();

    kernel.post(e, VirtualTime(10), tagged(&log, 1)).unwrap();
    kernel.post(e, VirtualTime(10), tagged(&log, 2)).unwrap();
    kernel.post(e, VirtualTime(5), tagged(&log, 3)).unwrap();

    kernel.advance_to(VirtualTime(10));
    assert_eq!(*log.lock().unwrap(), vec![3, 1, 2]);
}

#[test]
fn mixed_due_times_dispatch_in_order() {
    let (mut kernel, e) = kernel_with_entity();
    let observed: Arc<Mutex<Vec<u64>>> = Arc::default();

    // A deterministic scramble of due times.
    let dues: Vec<u64> = (0..64).map(|i| (i * 37) % 50).collect();
    for &due in &dues {
        let observed = observed.clone();
        kernel
            .post(e, VirtualTime(due), move |_: &mut dyn Entity, ctx: &mut Dispatch<'_>| {
                observed.lock().unwrap().push(ctx.now().get());
            })
            .unwrap();
    }

    kernel.advance_to(VirtualTime(50));
    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), dues.len());
    assert!(observed.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn partial_advance_leaves_later_events_pending() {
    let (mut kernel, e) = kernel_with_entity();
    let log: Log = Arc::default();

    kernel.post(e, VirtualTime(3), tagged(&log, 1)).unwrap();
    let later = kernel.post(e, VirtualTime(30), tagged(&log, 2)).unwrap();

    kernel.advance_to(VirtualTime(10));
    assert_eq!(*log.lock().unwrap(), vec![1]);
    assert!(kernel.is_pending(later));
    assert_eq!(kernel.now(), VirtualTime(10));

    kernel.advance_to(VirtualTime(30));
    assert_eq!(*log.lock().unwrap(), vec![1, 2]);
}

#[test]
fn identical_runs_dispatch_identically() {
    // The replay contract: the same posts against the same config
    // produce the same order, every run.
    fn run() -> Vec<u64> {
        let (mut kernel, e) = kernel_with_entity();
        let log: Log = Arc::default();
        for tag in 0..32u64 {
            let due = (tag * 13) % 8;
            kernel.post(e, VirtualTime(due), tagged(&log, tag)).unwrap();
        }
        kernel.advance_to(VirtualTime(8));
        let order = log.lock().unwrap().clone();
        order
    }

    let first = run();
    assert_eq!(first.len(), 32);
    for _ in 0..4 {
        assert_eq!(run(), first);
    }
}
