//! Criterion benchmarks for `birdcal-math`.
//!
//! Focus on the fitting kernels that run once per backtest fold.

use birdcal_math::{fit_linear, fit_multilinear, fit_quadratic, sample_curve, CurveFit, Point};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn synthetic_points(n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let x = i as f64 * 0.37;
            (x, 0.8 + 1.9 * x - 0.04 * x * x + ((i * 7919) % 13) as f64 * 0.01)
        })
        .collect()
}

fn bench_fit_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");

    for n in [8usize, 64, 512] {
        let points = synthetic_points(n);
        group.bench_with_input(BenchmarkId::new("linear", n), &points, |b, pts| {
            b.iter(|| black_box(fit_linear(black_box(pts))));
        });
        group.bench_with_input(BenchmarkId::new("quadratic", n), &points, |b, pts| {
            b.iter(|| black_box(fit_quadratic(black_box(pts))));
        });

        let rows: Vec<Vec<f64>> = points.iter().map(|&(x, _)| vec![x, 12.0 * x, x.sqrt()]).collect();
        let targets: Vec<f64> = points.iter().map(|&(_, y)| y).collect();
        group.bench_with_input(BenchmarkId::new("multilinear", n), &(rows, targets), |b, (r, t)| {
            b.iter(|| black_box(fit_multilinear(black_box(r), black_box(t))));
        });
    }

    let fit = CurveFit::fit(&synthetic_points(64));
    group.bench_function("sample_curve_200", |b| {
        b.iter(|| black_box(sample_curve(black_box(&fit), 0.0, 25.0, 200)));
    });

    group.finish();
}

criterion_group!(benches, bench_fit_kernels);
criterion_main!(benches);
