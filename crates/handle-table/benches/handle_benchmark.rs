//! Benchmark: handle allocation, release and pruning sweep cost.

use criterion::{criterion_group, criterion_main, Criterion};
use handle_table::{
    Collector, GenerationContext, HandleDiagnostics, HandleTable, MarkToken, ObjectRef,
};
use std::hint::black_box;

/// Marks every other object.
struct HalfMarked;

impl Collector for HalfMarked {
    fn is_marked(&self, object: ObjectRef, _mark: MarkToken) -> bool {
        object.addr() % 32 == 0
    }

    fn schedule_full_collection(&self, _reason: &'static str, _: &HandleDiagnostics) {}
}

fn object(n: usize) -> ObjectRef {
    ObjectRef::from_addr(0x10_0000 + n * 16).unwrap()
}

fn bench_allocate_10000(c: &mut Criterion) {
    c.bench_function("allocate_10000_handles", |b| {
        b.iter(|| {
            let mut table = HandleTable::new(HalfMarked);
            for n in 0..10_000 {
                black_box(table.allocate(object(n)));
            }
            table
        });
    });
}

fn bench_allocate_release_cycle(c: &mut Criterion) {
    let mut table = HandleTable::new(HalfMarked);
    c.bench_function("allocate_release_cycle", |b| {
        b.iter(|| {
            let handle = table.allocate(object(1));
            black_box(table.release(handle));
        });
    });
}

fn bench_sweep_10000_weak(c: &mut Criterion) {
    c.bench_function("sweep_10000_weak_handles", |b| {
        b.iter_batched(
            || {
                let mut table = HandleTable::new(HalfMarked);
                for n in 0..10_000 {
                    table.allocate_weak(object(n));
                }
                table
            },
            |mut table| {
                let stats =
                    table.deallocate_handles(&mut Vec::new(), MarkToken(1), GenerationContext::Mature);
                black_box(stats);
                table
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

fn bench_validate(c: &mut Criterion) {
    let mut table = HandleTable::new(HalfMarked);
    let handles: Vec<_> = (0..1_000).map(|n| table.allocate(object(n))).collect();
    c.bench_function("validate_1000_handles", |b| {
        b.iter(|| handles.iter().filter(|&&handle| table.validate(handle)).count());
    });
}

criterion_group!(
    handle_table_benches,
    bench_allocate_10000,
    bench_allocate_release_cycle,
    bench_sweep_10000_weak,
    bench_validate
);
criterion_main!(handle_table_benches);
