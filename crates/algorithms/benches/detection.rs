//! Benchmarks for the detection stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scarmap_algorithms::config::DetectionConfig;
use scarmap_algorithms::imagery::{change_index, ChangeIndexParams};
use scarmap_algorithms::morphology::{sieve, SieveParams};
use scarmap_algorithms::pipeline::{LandslideDetector, SceneInputs};
use scarmap_algorithms::statistics::{focal_coverage, FocalCoverageParams};
use scarmap_algorithms::vector::polygonize;
use scarmap_core::raster::{Mask, MASK_NODATA};
use scarmap_core::{GeoTransform, Raster};

fn grid<T: scarmap_core::RasterElement>(size: usize, f: impl Fn(usize, usize) -> T) -> Raster<T> {
    let mut data = Vec::with_capacity(size * size);
    for row in 0..size {
        for col in 0..size {
            data.push(f(row, col));
        }
    }
    let mut r = Raster::from_vec(data, size, size).unwrap();
    r.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));
    r
}

/// Vegetation index with scattered patches of loss
fn pre_ndvi(size: usize) -> Raster<f64> {
    grid(size, |_, _| 0.8)
}

fn post_ndvi(size: usize) -> Raster<f64> {
    grid(size, |row, col| {
        if (row * 7 + col * 13) % 97 < 9 || ((row / 16) + (col / 16)) % 5 == 0 {
            0.15
        } else {
            0.8
        }
    })
}

fn speckle_mask(size: usize) -> Mask {
    let mut m: Mask = grid(size, |row, col| u8::from((row * 31 + col * 17) % 11 < 4));
    m.set_nodata(Some(MASK_NODATA));
    m
}

fn bench_change_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection/change_index");
    for size in [256, 512, 1024] {
        let pre = pre_ndvi(size);
        let post = post_ndvi(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| change_index(black_box(&pre), black_box(&post), ChangeIndexParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_focal(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection/focal_coverage");
    for size in [256, 512, 1024] {
        let post = post_ndvi(size);
        for kernel_size in [3, 7] {
            let params = FocalCoverageParams {
                kernel_size,
                ..Default::default()
            };
            group.bench_with_input(BenchmarkId::new(format!("k{kernel_size}"), size), &size, |b, _| {
                b.iter(|| focal_coverage(black_box(&post), params).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_sieve(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection/sieve");
    for size in [256, 512] {
        let mask = speckle_mask(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| sieve(black_box(&mask), SieveParams::default(), None).unwrap())
        });
    }
    group.finish();
}

fn bench_polygonize(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection/polygonize");
    for size in [256, 512] {
        let mask = speckle_mask(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| polygonize(black_box(&mask), 1).unwrap())
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection/pipeline");
    group.sample_size(10);
    let detector = LandslideDetector::new(DetectionConfig {
        min_area: 500.0,
        ..Default::default()
    })
    .unwrap();
    for size in [256, 512] {
        let pre = pre_ndvi(size);
        let post = post_ndvi(size);
        let ndwi = grid(size, |_, _| -0.3);
        let dem = grid(size, |row, col| 1000.0 - 2.0 * row as f64 + 0.5 * col as f64);
        let scene = SceneInputs::new(&pre, &post, &ndwi, &dem);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| detector.detect(black_box(&scene)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_change_index,
    bench_focal,
    bench_sieve,
    bench_polygonize,
    bench_pipeline
);
criterion_main!(benches);
