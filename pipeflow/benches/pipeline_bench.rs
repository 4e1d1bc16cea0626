//! Benchmarks for flow throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pipeflow::prelude::*;

const ELEMENTS: i64 = 10_000;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn pipeline_benchmark(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("passthrough_chain", |b| {
        b.to_async(&rt).iter(|| async {
            let got = from_iter(0..ELEMENTS)
                .thru_all(vec![passthrough(), passthrough(), passthrough()])
                .collect()
                .await;
            black_box(got)
        });
    });

    c.bench_function("batch_then_flatten", |b| {
        b.to_async(&rt).iter(|| async {
            let got = from_iter(0..ELEMENTS)
                .thru(batch_n(64))
                .thru(flatten())
                .collect()
                .await;
            black_box(got)
        });
    });

    let mut group = c.benchmark_group("parallelize");
    for workers in [1_usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &n| {
            b.to_async(&rt).iter(|| async move {
                let pipe = parallelize(n, || map(|i: i64| i.wrapping_mul(31))).unwrap();
                let got = from_iter(0..ELEMENTS).thru(pipe).collect().await;
                black_box(got)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
