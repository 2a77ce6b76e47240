//! Lock manager hot-path benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use waitdie_bench::{manager_with_resources, resource};
use waitdie_core::{AcquireOutcome, Timestamp};

/// Benchmark an uncontended acquire/release pair.
fn bench_uncontended(c: &mut Criterion) {
    let manager = manager_with_resources(1);
    let r = resource(0);
    let mut txn = manager.begin();

    c.bench_function("acquire_release_uncontended", |b| {
        b.iter(|| {
            manager.acquire(&mut txn, black_box(&r)).unwrap();
            manager.release(&mut txn, black_box(&r)).unwrap();
        });
    });
}

/// Benchmark the die path: a young requester against an old holder.
fn bench_die(c: &mut Criterion) {
    let manager = manager_with_resources(1);
    let r = resource(0);
    let mut holder = manager.begin_with_timestamp(Timestamp::new(1));
    manager.acquire(&mut holder, &r).unwrap();
    let mut young = manager.begin_with_timestamp(Timestamp::new(1_000));

    c.bench_function("acquire_die_and_restart", |b| {
        b.iter(|| {
            let outcome = manager.acquire(&mut young, black_box(&r)).unwrap();
            assert_eq!(outcome, AcquireOutcome::Aborted);
            manager.restart(&mut young).unwrap();
        });
    });
}

/// Benchmark a two-phase plan over N resources with a commit.
fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_commit");

    for count in [2usize, 8, 32].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let manager = manager_with_resources(count);
            let resources: Vec<_> = (0..count).map(resource).collect();

            b.iter(|| {
                let mut txn = manager.begin();
                for r in &resources {
                    manager.acquire(&mut txn, r).unwrap();
                }
                manager.commit(&mut txn).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_die, bench_plan);
criterion_main!(benches);
