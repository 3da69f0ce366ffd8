//! Criterion micro-benchmarks for posting, draining, and cancellation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::any::Any;

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

fn noop() -> impl FnOnce(&mut dyn Entity, &mut Dispatch<'_>) + Send {
    |_, _| {}
}

fn fresh_kernel() -> (Kernel, EntityId) {
    let kernel = Kernel::new(KernelConfig::default()).unwrap();
    let e = kernel.registry().register(Box::new(Dummy));
    (kernel, e)
}

/// Scrambled-but-deterministic due times in [0, 512).
fn due(i: u64) -> VirtualTime {
    VirtualTime((i * 7919) % 512)
}

fn post_and_drain(c: &mut Criterion) {
    c.bench_function("post_1k_then_advance", |b| {
        b.iter(|| {
            let (mut kernel, e) = fresh_kernel();
            for i in 0..1_000u64 {
                kernel.post(e, due(i), noop()).unwrap();
            }
            black_box(kernel.advance_to(VirtualTime(512)))
        });
    });
}

fn cancel_half(c: &mut Criterion) {
    c.bench_function("cancel_500_of_1k", |b| {
        b.iter(|| {
            let (kernel, e) = fresh_kernel();
            let seqs: Vec<_> = (0..1_000u64)
                .map(|i| kernel.post(e, due(i), noop()).unwrap())
                .collect();
            for seq in seqs.iter().step_by(2) {
                kernel.cancel(*seq);
            }
            black_box(kernel.pending())
        });
    });
}

fn same_tick_storm(c: &mut Criterion) {
    c.bench_function("same_tick_1k", |b| {
        b.iter(|| {
            let (mut kernel, e) = fresh_kernel();
            let now = kernel.now();
            for _ in 0..1_000u64 {
                kernel.post(e, now, noop()).unwrap();
            }
            black_box(kernel.advance_to(now))
        });
    });
}

criterion_group!(benches, post_and_drain, cancel_half, same_tick_storm);
criterion_main!(benches);
