//! Criterion microbenches for boxmark geometry and partitioning.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - Box clamping and rotation (per-annotation work in the editor and export)
//! - Split sizing and shuffled partitioning of large image sets

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use boxmark::ir::{BoundingBox, ImageSize, Pixel, Rotation};
use boxmark::split::{partition, split_counts, SplitOptions, SplitRatios};

fn sample_boxes(n: usize) -> Vec<BoundingBox<Pixel>> {
    (0..n)
        .map(|i| {
            let f = i as f64;
            BoundingBox::new(f % 700.0 - 50.0, f % 500.0 - 20.0, 40.0 + f % 90.0, 30.0 + f % 60.0)
        })
        .collect()
}

/// Benchmark clamping boxes to an image.
fn bench_clamp(c: &mut Criterion) {
    let boxes = sample_boxes(1000);
    let size = ImageSize::new(640.0, 480.0);

    let mut group = c.benchmark_group("geometry");
    group.throughput(Throughput::Elements(boxes.len() as u64));

    group.bench_function("clamp_to_image", |b| {
        b.iter(|| {
            let clamped: Vec<_> = black_box(&boxes)
                .iter()
                .map(|bbox| bbox.normalized().clamp_to_image(size))
                .collect();
            black_box(clamped)
        })
    });

    group.finish();
}

/// Benchmark rotating boxes through every export rotation.
fn bench_rotate(c: &mut Criterion) {
    let size = ImageSize::new(640.0, 480.0);
    let boxes: Vec<_> = sample_boxes(1000)
        .iter()
        .map(|bbox| bbox.clamp_to_image(size))
        .collect();

    let mut group = c.benchmark_group("geometry");
    group.throughput(Throughput::Elements((boxes.len() * Rotation::ALL.len()) as u64));

    group.bench_function("rotated_all", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(boxes.len() * Rotation::ALL.len());
            for rotation in Rotation::ALL {
                out.extend(boxes.iter().map(|bbox| bbox.rotated(rotation, size)));
            }
            black_box(out)
        })
    });

    group.finish();
}

/// Benchmark split sizing and partitioning of 10k items.
fn bench_partition(c: &mut Criterion) {
    let items: Vec<u32> = (0..10_000).collect();
    let opts = SplitOptions {
        ratios: SplitRatios::default(),
        seed: Some(42),
    };

    let mut group = c.benchmark_group("split");
    group.throughput(Throughput::Elements(items.len() as u64));

    group.bench_function("split_counts", |b| {
        b.iter(|| black_box(split_counts(black_box(items.len()), &opts.ratios)))
    });

    group.bench_function("partition_seeded", |b| {
        b.iter(|| {
            let part = partition(black_box(items.clone()), &opts).unwrap();
            black_box(part)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_clamp, bench_rotate, bench_partition);
criterion_main!(benches);
