//! Benchmarks for generation, batching and dispatch overhead
//!
//! This benchmark measures:
//! - Record generation throughput
//! - Partitioning records into batches
//! - Dispatcher overhead with a no-op publisher

use batch_publisher::batch::{BatchConfig, IntoBatches};
use batch_publisher::{BatchDispatcher, DispatcherConfig, DryRunPublisher, MessageGenerator};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

const RECORDS: usize = 10_000;

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    group.throughput(Throughput::Elements(RECORDS as u64));

    group.bench_function("generate_10k", |b| {
        b.iter(|| {
            for r in MessageGenerator::new(RECORDS) {
                black_box(r);
            }
        })
    });

    group.finish();
}

fn bench_batching(c: &mut Criterion) {
    let mut group = c.benchmark_group("batching");
    group.throughput(Throughput::Elements(RECORDS as u64));
    let config = BatchConfig::default();

    group.bench_function("generate_and_batch_10k", |b| {
        b.iter(|| {
            let n = MessageGenerator::new(RECORDS).batches(&config).count();
            black_box(n)
        })
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(RECORDS as u64));
    let config = BatchConfig::default();

    for max_inflight in [1usize, 64, 500] {
        group.bench_function(format!("dry_run_10k_inflight_{}", max_inflight), |b| {
            b.to_async(&rt).iter(|| async {
                let dispatcher = BatchDispatcher::new(
                    Arc::new(DryRunPublisher::new()),
                    DispatcherConfig::new().with_max_inflight(max_inflight),
                );
                let report = dispatcher
                    .dispatch_all(MessageGenerator::new(RECORDS).batches(&config))
                    .await;
                black_box(report.success_count())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generation, bench_batching, bench_dispatch);
criterion_main!(benches);
