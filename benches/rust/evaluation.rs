//! Evaluation Benchmark
//!
//! Batch evaluation of a space curve through the memoizing evaluator, the
//! compiled register program and interval bounds, plus repeated
//! differentiation with deduplication.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use parametric_expr::{
    Evaluator, Interval, Matrix, ParametricExpression, Point3, cos, exp, sin,
};

// =============================================================================
// Expression Generator
// =============================================================================

/// Damped helix: (e^(-t/10) cos t, e^(-t/10) sin t, t / 4)
fn damped_helix() -> ParametricExpression<Point3> {
    let t = ParametricExpression::<f64>::parameter(0).expect("Valid parameter index");
    let decay = exp(&t.scaled(-0.1)).expect("Should build");
    ParametricExpression::<Point3>::from_components(&[
        (&cos(&t).expect("Should build") * &decay).expect("Should build"),
        (&sin(&t).expect("Should build") * &decay).expect("Should build"),
        t.scaled(0.25),
    ])
    .expect("Should build")
}

fn samples(n: usize) -> Matrix<f64> {
    Matrix::from_fn(1, n, |_, col| col as f64 * 0.01)
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_batch_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_evaluation");
    let curvature = damped_helix().curvature().expect("Should differentiate");
    let program = curvature.compile();

    for n in [1, 100, 10_000] {
        let input = Arc::new(samples(n));

        group.bench_with_input(BenchmarkId::new("evaluator", n), &input, |b, input| {
            b.iter(|| {
                let mut evaluator = Evaluator::new();
                curvature.evaluate_with(&mut evaluator, black_box(input))
            })
        });

        group.bench_with_input(BenchmarkId::new("compiled", n), &input, |b, input| {
            b.iter(|| program.evaluate(black_box(input.as_ref())))
        });
    }

    let bounds = Arc::new(Matrix::from_fn(1, 100, |_, col| {
        let lower = col as f64 * 0.1;
        Interval::new(lower, lower + 0.1)
    }));
    group.bench_function("bounds/100", |b| {
        b.iter(|| {
            let mut evaluator = Evaluator::new();
            curvature.evaluate_with(&mut evaluator, black_box(&bounds))
        })
    });

    group.finish();
}

fn bench_differentiation(c: &mut Criterion) {
    let mut group = c.benchmark_group("differentiation");
    let helix = damped_helix();

    group.bench_function("curvature", |b| {
        b.iter(|| black_box(&helix).curvature())
    });

    group.bench_function("third_derivative", |b| {
        b.iter(|| {
            black_box(&helix)
                .derivative()
                .and_then(|d| d.derivative())
                .and_then(|d| d.derivative())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_batch_evaluation, bench_differentiation);
criterion_main!(benches);
