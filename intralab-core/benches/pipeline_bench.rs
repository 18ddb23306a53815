//! Criterion benchmarks for the per-symbol pipeline.
//!
//! Benchmarks:
//! 1. Mean-reversion signal generation
//! 2. Single-symbol backtest (positions, PnL, daily stop, equity)
//! 3. Metric computation
//! 4. 1-minute to 3-minute resampling

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use intralab_core::data::to_3min;
use intralab_core::domain::{split_signal_bars, Bar};
use intralab_core::{backtest_symbol, mean_reversion, BacktestConfig, MeanRevParams, SymbolMetrics};

// ── Helpers ──────────────────────────────────────────────────────────

/// `days` sessions of 375 minutes, one bar every `bar_minutes`.
fn make_bars(days: usize, bar_minutes: i64) -> Vec<Bar> {
    let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let per_day = (375 / bar_minutes) as usize;
    let mut out = Vec::with_capacity(days * per_day);
    for d in 0..days {
        let open = (first + Duration::days(d as i64)).and_hms_opt(9, 15, 0).unwrap();
        for i in 0..per_day {
            let k = (d * per_day + i) as f64;
            let close = 100.0 + (k * 0.07).sin() * 3.0 + (k * 0.011).cos();
            out.push(Bar {
                symbol: "INFY".into(),
                datetime: open + Duration::minutes(bar_minutes * i as i64),
                open: close - 0.1,
                high: close + 0.4,
                low: close - 0.4,
                close,
                volume: 1_000.0 + (i % 50) as f64,
            });
        }
    }
    out
}

// ── 1. Signal ────────────────────────────────────────────────────────

fn bench_signal(c: &mut Criterion) {
    let mut group = c.benchmark_group("mean_reversion");
    let params = MeanRevParams::default();
    for &days in &[5, 20, 60] {
        let bars = make_bars(days, 3);
        group.bench_with_input(BenchmarkId::new("win_20", bars.len()), &bars, |b, bars| {
            b.iter(|| mean_reversion(black_box(bars), black_box(&params)))
        });
    }
    group.finish();
}

// ── 2. Backtest ──────────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest_symbol");
    let cfg = BacktestConfig::default();
    for &days in &[5, 20, 60] {
        let rows = mean_reversion(&make_bars(days, 3), &MeanRevParams::default()).unwrap();
        let (bars, sigs) = split_signal_bars(&rows);
        group.bench_with_input(BenchmarkId::new("default_cfg", bars.len()), &days, |b, _| {
            b.iter(|| backtest_symbol("INFY", black_box(&bars), black_box(&sigs), &cfg))
        });
    }
    group.finish();
}

// ── 3. Metrics ───────────────────────────────────────────────────────

fn bench_metrics(c: &mut Criterion) {
    let rows = mean_reversion(&make_bars(60, 3), &MeanRevParams::default()).unwrap();
    let (bars, sigs) = split_signal_bars(&rows);
    let frame = backtest_symbol("INFY", &bars, &sigs, &BacktestConfig::default()).unwrap();
    c.bench_function("metrics_60_days", |b| {
        b.iter(|| SymbolMetrics::compute(black_box(&frame)))
    });
}

// ── 4. Resample ──────────────────────────────────────────────────────

fn bench_resample(c: &mut Criterion) {
    let minute_bars = make_bars(20, 1);
    c.bench_function("to_3min_20_days", |b| {
        b.iter(|| to_3min(black_box(&minute_bars)))
    });
}

criterion_group!(
    benches,
    bench_signal,
    bench_backtest,
    bench_metrics,
    bench_resample,
);
criterion_main!(benches);
