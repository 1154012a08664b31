//! Kernel and engine throughput for both counting strategies.
//!
//! Run with: cargo bench -p histobench

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use histobench::{ChannelBuffers, HistogramEngine, Strategy};
use std::collections::BTreeSet;

/// Deterministic noise so both kernels see the same skew-free input.
fn generate_samples(len: usize) -> Vec<u8> {
    let mut x = 123_456_789u32;
    (0..len)
        .map(|_| {
            x = x.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (x >> 24) as u8
        })
        .collect()
}

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernels");

    for len in [4_096usize, 262_144, 4_194_304] {
        let samples = generate_samples(len);
        group.throughput(Throughput::Elements(len as u64));

        for strategy in Strategy::ALL {
            let kernel = strategy.kernel();
            group.bench_with_input(BenchmarkId::new(strategy.name(), len), &samples, |b, samples| {
                b.iter(|| kernel(black_box(samples)));
            });
        }
    }

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    let (width, height) = (1920u32, 1080u32);
    let rgba = generate_samples((width * height * 4) as usize);
    let buffers = ChannelBuffers::from_rgba(width, height, &rgba).expect("valid RGBA");
    let threads = num_cpus::get().max(1);
    let engine = HistogramEngine::new(threads).expect("pool starts");

    group.throughput(Throughput::Elements((width * height) as u64 * 4));
    let worker_counts: BTreeSet<usize> = [1, 2, threads].into_iter().collect();
    for workers in worker_counts {
        for strategy in Strategy::ALL {
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), format!("{workers} workers")),
                &workers,
                |b, &workers| {
                    b.iter(|| engine.compute(black_box(&buffers), workers, strategy));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_kernels, bench_engine);
criterion_main!(benches);
