//! Benchmark for noise sampling.
//!
//! Run with: cargo bench --package strata_procedural --bench noise_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_procedural::noise::{SimplexNoise, WorldSeed};

fn benchmark_sample_2d(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    let mut group = c.benchmark_group("simplex_2d");
    group.throughput(Throughput::Elements(32 * 32));
    group.bench_function("column_grid_32x32", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for z in 0..32 {
                for x in 0..32 {
                    sum += noise.sample(f64::from(x) / 30.0, f64::from(z) / 30.0);
                }
            }
            black_box(sum)
        });
    });
    group.finish();
}

fn benchmark_sample_3d(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    let mut group = c.benchmark_group("simplex_3d");
    group.throughput(Throughput::Elements(32 * 32 * 32));
    group.bench_function("chunk_volume_32", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for y in 0..32 {
                for z in 0..32 {
                    for x in 0..32 {
                        sum += noise.sample3(
                            f64::from(x) / 20.0,
                            f64::from(y) / 20.0,
                            f64::from(z) / 20.0,
                        );
                    }
                }
            }
            black_box(sum)
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_sample_2d, benchmark_sample_3d);
criterion_main!(benches);
