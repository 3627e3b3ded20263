//! Benchmarks for validation runs, profiling and the statistical primitives.

use arrow::array::{ArrayRef, Float64Array, StringArray};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use stat_guard::analyzers::{Comparator, DatasetProfiler, ProfileOptions};
use stat_guard::core::{ColumnRoles, DatasetView, EngineConfig, Policy, ValidationEngine};
use stat_guard::stats;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn experiment(rows: usize, shift: f64) -> DatasetView {
    let revenue: Vec<Option<f64>> = (0..rows)
        .map(|i| (i % 53 != 0).then(|| shift + 20.0 + ((i * 37) % 41) as f64 + ((i * 13) % 7) as f64 * 0.25))
        .collect();
    let cost: Vec<f64> = (0..rows).map(|i| 5.0 + ((i * 11) % 17) as f64).collect();
    let arms: Vec<&str> = (0..rows)
        .map(|i| if i % 2 == 0 { "control" } else { "treatment" })
        .collect();
    let regions: Vec<&str> = (0..rows).map(|i| ["eu", "us", "apac", "latam"][i % 4]).collect();
    let users: Vec<String> = (0..rows).map(|i| format!("u{i:07}")).collect();
    DatasetView::try_from_columns(vec![
        ("revenue", Arc::new(Float64Array::from(revenue)) as ArrayRef),
        ("cost", Arc::new(Float64Array::from(cost)) as ArrayRef),
        ("arm", Arc::new(StringArray::from(arms)) as ArrayRef),
        ("region", Arc::new(StringArray::from(regions)) as ArrayRef),
        ("user", Arc::new(StringArray::from(users)) as ArrayRef),
    ])
    .unwrap()
}

fn roles() -> ColumnRoles {
    ColumnRoles::new()
        .with_target("revenue")
        .with_group("arm")
        .with_unit("user")
}

fn bench_validation_runs(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation_run");
    group.measurement_time(Duration::from_secs(10));

    for rows in [1_000, 10_000, 100_000] {
        let view = experiment(rows, 0.0);
        for (mode, parallel) in [("sequential", false), ("parallel", true)] {
            let engine = ValidationEngine::builder()
                .config(EngineConfig {
                    parallel,
                    ..EngineConfig::default()
                })
                .build();
            group.bench_with_input(BenchmarkId::new(mode, rows), &view, |b, view| {
                b.iter(|| engine.run(black_box(view), &Policy::experiment(), &roles()));
            });
        }
    }

    group.finish();
}

fn bench_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("policies");
    let view = experiment(10_000, 0.0);
    let engine = ValidationEngine::default();

    for name in ["default", "strict", "lenient", "experiment"] {
        let policy = Policy::named(name).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &policy, |b, policy| {
            b.iter(|| engine.run(black_box(&view), policy, &roles()));
        });
    }

    group.finish();
}

fn bench_profiling(c: &mut Criterion) {
    let mut group = c.benchmark_group("profiling");
    let view = experiment(50_000, 0.0);

    for (name, correlations) in [("with_correlations", true), ("without_correlations", false)] {
        let profiler = DatasetProfiler::new(ProfileOptions::default().with_correlations(correlations));
        group.bench_function(name, |b| b.iter(|| profiler.profile(black_box(&view))));
    }

    let shifted = experiment(50_000, 0.5);
    group.bench_function("compare", |b| {
        b.iter(|| Comparator::new().compare(black_box(&view), black_box(&shifted), "revenue"));
    });

    group.finish();
}

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");
    let a: Vec<f64> = (0..5_000).map(|i| ((i * 37) % 101) as f64).collect();
    let b: Vec<f64> = (0..5_000).map(|i| ((i * 41) % 103) as f64 + 0.5).collect();

    group.bench_function("describe", |bench| bench.iter(|| stats::describe(black_box(&a))));
    group.bench_function("shapiro_wilk", |bench| {
        bench.iter(|| stats::shapiro_wilk(black_box(&a)));
    });
    group.bench_function("ks_two_sample", |bench| {
        bench.iter(|| stats::ks_two_sample(black_box(&a), black_box(&b)));
    });
    group.bench_function("levene", |bench| {
        bench.iter(|| stats::levene(black_box(&[a.as_slice(), b.as_slice()])));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_validation_runs,
    bench_policies,
    bench_profiling,
    bench_primitives
);

criterion_main!(benches);
