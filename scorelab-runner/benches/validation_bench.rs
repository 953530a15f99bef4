//! Criterion benchmarks for the validation hot paths.
//!
//! Benchmarks:
//! 1. Return metrics over growing samples
//! 2. PBO and deflated Sharpe
//! 3. Full walk-forward run against the synthetic market

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use scorelab_core::calendar::WeekdayCalendar;
use scorelab_core::domain::StrategyKind;
use scorelab_core::{Scorer, ScoringConfig, SyntheticMarket, Universe};
use scorelab_runner::metrics::ReturnMetrics;
use scorelab_runner::{
    compute_pbo, deflated_sharpe, ValidationConfig, ValidationParams, WalkForwardValidator,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn returns(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 7919) % 200) as f64 / 50.0 - 1.9).collect()
}

// ── 1. Return metrics ────────────────────────────────────────────────

fn bench_return_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("return_metrics");
    for &n in &[42usize, 252, 2520] {
        let sample = returns(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &sample, |b, sample| {
            b.iter(|| ReturnMetrics::compute(black_box(sample), n / 3));
        });
    }
    group.finish();
}

// ── 2. Overfitting statistics ────────────────────────────────────────

fn bench_overfit(c: &mut Criterion) {
    let windows: Vec<(f64, f64)> = (0..64)
        .map(|i| (1.0 + (i % 5) as f64 * 0.1, (i % 7) as f64 * 0.2 - 0.4))
        .collect();
    c.bench_function("compute_pbo_64", |b| b.iter(|| compute_pbo(black_box(&windows))));

    let sample = returns(252);
    c.bench_function("deflated_sharpe_252", |b| {
        b.iter(|| deflated_sharpe(black_box(&sample), 4))
    });
}

// ── 3. Walk-forward run ──────────────────────────────────────────────

fn bench_walk_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk_forward");
    group.sample_size(10);

    let market = SyntheticMarket::new(42);
    let calendar = WeekdayCalendar::new();
    let scorer = Scorer::new(&market, &calendar, ScoringConfig::default());
    let mut config = ValidationConfig::default();
    config.monitoring.enabled = false;
    let validator = WalkForwardValidator::for_scorer(&scorer, config);
    let universe = Universe::default_krx();
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();

    for &windows in &[1usize, 2] {
        let params = ValidationParams::default()
            .with_sessions(20, 5, 1)
            .with_max_windows(windows)
            .with_min_sample_size(3);
        group.bench_with_input(BenchmarkId::new("intraday", windows), &params, |b, params| {
            b.iter(|| validator.run(StrategyKind::Intraday, black_box(&universe), params, as_of));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_return_metrics, bench_overfit, bench_walk_forward);
criterion_main!(benches);
