//! End-to-end backtest scenarios with hand-checked numbers.
//!
//! A: one quiet day, no stop.
//! B: a day whose cumulative PnL lands exactly on the stop threshold.
//! C: two days, each stopping at a different bar.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use intralab_core::engine::apply_daily_stop;
use intralab_core::{backtest_symbol, BacktestConfig, SymbolMetrics};
use intralab_core::domain::{Bar, SignalPoint};

const EPS: f64 = 1e-9;

fn open_of(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, day)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap()
}

/// Bars on consecutive 3-minute slots of `day`.
fn day_bars(day: u32, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar {
            symbol: "RELIANCE".into(),
            datetime: open_of(day) + Duration::minutes(3 * i as i64),
            open: c,
            high: c,
            low: c,
            close: c,
            volume: 1_000.0,
        })
        .collect()
}

fn aligned(bars: &[Bar], sigs: &[f64]) -> Vec<SignalPoint> {
    bars.iter()
        .zip(sigs)
        .map(|(b, &s)| SignalPoint {
            datetime: b.datetime,
            signal: s,
        })
        .collect()
}

#[test]
fn scenario_a_single_quiet_day() {
    let closes = [100.0, 101.0, 99.0, 98.0, 100.0];
    let bars = day_bars(1, &closes);
    let sigs = aligned(&bars, &[0.0, 1.0, 1.0, 0.0, -1.0]);
    let cfg = BacktestConfig::default();

    let frame = backtest_symbol("RELIANCE", &bars, &sigs, &cfg).unwrap();

    // zero carries the held long into bar 3
    let positions: Vec<f64> = frame.rows.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![0.0, 1.0, 1.0, 1.0, -1.0]);

    let trade_flags: Vec<bool> = frame.rows.iter().map(|r| r.trade).collect();
    assert_eq!(trade_flags, vec![false, true, false, false, true]);

    let rate = 3.0 / 1e4;
    let expected = [
        0.0,
        -rate * 101.0 * 15.0,
        (99.0 / 101.0 - 1.0) * 99.0 * 15.0,
        (98.0 / 99.0 - 1.0) * 98.0 * 15.0,
        (100.0 / 98.0 - 1.0) * 100.0 * 15.0 - rate * 100.0 * 15.0,
    ];
    for (row, exp) in frame.rows.iter().zip(expected) {
        assert!((row.pnl - exp).abs() < EPS, "pnl {} vs {}", row.pnl, exp);
        assert_eq!(row.pnl, row.raw_pnl, "no truncation expected");
        assert_eq!(row.pnl, row.gross_pnl - row.cost);
    }
    assert!(frame.stops.is_empty());

    let m = SymbolMetrics::compute(&frame);
    assert_eq!(m.trades, 3);
    assert_eq!(m.net_pnl, -14.55);
    assert_eq!(m.daily_sharpe, 0.0);
    assert_eq!(m.max_drawdown, 44.71);
    assert_eq!(frame.turns(), 2);
}

#[test]
fn scenario_b_exact_threshold() {
    let dates = vec![open_of(2).date(); 5];
    let pnl = [-100.0, -200.0, -300.0, 80.0, -40.0];

    let out = apply_daily_stop(&dates, &pnl, BacktestConfig::default().daily_loss_limit());

    assert_eq!(out.pnl, vec![-100.0, -200.0, -300.0, 0.0, 0.0]);
    assert_eq!(out.stops.len(), 1);
    assert_eq!(out.stops[0].trigger_index, 2);
    assert_eq!(out.stops[0].cumulative_pnl, -600.0);
}

#[test]
fn scenario_b_just_above_threshold_does_not_stop() {
    let dates = vec![open_of(2).date(); 4];
    let pnl = [-100.0, -200.0, -299.5, -50.0];
    let out = apply_daily_stop(&dates, &pnl, 600.0);
    // -599.5 does not trigger; -649.5 at bar 3 does, with nothing after it
    assert_eq!(out.pnl, pnl.to_vec());
    assert_eq!(out.stops[0].trigger_index, 3);
}

#[test]
fn scenario_c_two_days_stop_independently() {
    let mut bars = day_bars(3, &[100.0, 99.5, 99.0, 100.0, 101.0]);
    bars.extend(day_bars(4, &[101.0, 100.0, 101.0, 102.0]));
    let sigs = aligned(&bars, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let cfg = BacktestConfig {
        qty_per_trade: 1_000,
        transaction_cost_bps: 0.0,
        ..Default::default()
    };

    let frame = backtest_symbol("RELIANCE", &bars, &sigs, &cfg).unwrap();

    let triggers: Vec<usize> = frame.stops.iter().map(|s| s.trigger_index).collect();
    assert_eq!(triggers, vec![2, 6]);

    // day 3: bars 3 and 4 zeroed, bars 0..=2 untouched
    for t in 0..=2 {
        assert_eq!(frame.rows[t].pnl, frame.rows[t].raw_pnl);
    }
    assert_eq!(frame.rows[3].pnl, 0.0);
    assert_eq!(frame.rows[4].pnl, 0.0);
    assert!(frame.rows[3].raw_pnl > 0.0);

    // day 4 starts fresh: its first bar is untouched even though day 3 stopped
    assert_eq!(frame.rows[5].pnl, frame.rows[5].raw_pnl);
    assert_eq!(frame.rows[6].pnl, frame.rows[6].raw_pnl);
    assert_eq!(frame.rows[7].pnl, 0.0);
    assert_eq!(frame.rows[8].pnl, 0.0);

    let m = SymbolMetrics::compute(&frame);
    assert_eq!(m.trades, 1);
    assert!(m.max_drawdown > 0.0);
    assert!(m.net_pnl < 0.0);
}

#[test]
fn all_zero_signals_are_inert() {
    let bars = day_bars(5, &[100.0, 105.0, 95.0, 110.0]);
    let sigs = aligned(&bars, &[0.0; 4]);
    let frame = backtest_symbol("RELIANCE", &bars, &sigs, &BacktestConfig::default()).unwrap();
    assert!(frame.rows.iter().all(|r| r.position == 0.0 && r.pnl == 0.0));

    let m = SymbolMetrics::compute(&frame);
    assert_eq!(m.trades, 0);
    assert_eq!(m.net_pnl, 0.0);
    assert_eq!(m.max_drawdown, 0.0);
    assert_eq!(m.daily_sharpe, 0.0);
}

#[test]
fn multi_day_sharpe_uses_daily_sums() {
    // long the whole time on a market that rises, falls, rises across three days
    let mut bars = day_bars(8, &[100.0, 101.0]);
    bars.extend(day_bars(9, &[101.0, 100.5]));
    bars.extend(day_bars(10, &[100.5, 102.0]));
    let mut s = vec![0.0; bars.len()];
    s[0] = 1.0;
    let sigs = aligned(&bars, &s);
    let cfg = BacktestConfig {
        transaction_cost_bps: 0.0,
        ..Default::default()
    };

    let frame = backtest_symbol("RELIANCE", &bars, &sigs, &cfg).unwrap();
    let m = SymbolMetrics::compute(&frame);

    let d1: f64 = (101.0 / 100.0 - 1.0) * 101.0 * 15.0;
    let d2: f64 = (100.5 / 101.0 - 1.0) * 100.5 * 15.0;
    let d3: f64 = (102.0 / 100.5 - 1.0) * 102.0 * 15.0;
    let mean = (d1 + d2 + d3) / 3.0;
    let var = ((d1 - mean).powi(2) + (d2 - mean).powi(2) + (d3 - mean).powi(2)) / 2.0;
    let expected = (mean / var.sqrt()) * 252.0_f64.sqrt();
    assert!((m.daily_sharpe - (expected * 100.0).round() / 100.0).abs() < EPS);
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let mut bars = day_bars(11, &[100.0, 99.0, 101.0, 97.0, 103.0]);
    bars.extend(day_bars(12, &[103.0, 104.0, 99.0]));
    let sigs = aligned(&bars, &[1.0, 0.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0]);
    let cfg = BacktestConfig::default();

    let a = backtest_symbol("RELIANCE", &bars, &sigs, &cfg).unwrap();
    let b = backtest_symbol("RELIANCE", &bars, &sigs, &cfg).unwrap();
    assert_eq!(a, b);
    assert_eq!(SymbolMetrics::compute(&a), SymbolMetrics::compute(&b));
}
