//! Single-symbol backtest: position resolution, PnL, daily stop, equity.
//!
//! Inputs are validated (config bounds, 1:1 timestamp alignment, strictly
//! ascending bars) before any arithmetic. Nothing here mutates caller data.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::domain::{split_signal_bars, Bar, SignalBar, SignalPoint};

use super::daily_stop::{apply_daily_stop, DailyStop};
use super::pnl::{compute_pnl, equity_curve};
use super::position::resolve_positions;
use super::EngineError;

/// One bar of backtest output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    pub datetime: NaiveDateTime,
    pub close: f64,
    pub signal: f64,
    pub position: f64,
    pub trade: bool,
    pub ret: f64,
    pub gross_pnl: f64,
    pub cost: f64,
    /// PnL before the daily stop was applied.
    pub raw_pnl: f64,
    /// PnL after the daily stop.
    pub pnl: f64,
    pub equity: f64,
}

impl BacktestRow {
    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }
}

/// The persisted per-bar shape: `{datetime, pnl, equity}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub datetime: NaiveDateTime,
    pub pnl: f64,
    pub equity: f64,
}

/// Full output of a single-symbol backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestFrame {
    pub symbol: String,
    pub rows: Vec<BacktestRow>,
    /// Days on which the daily stop fired.
    pub stops: Vec<DailyStop>,
}

impl BacktestFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn pnl(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.pnl).collect()
    }

    pub fn equity(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.equity).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(BacktestRow::date).collect()
    }

    /// Bars charged transaction cost (position changes).
    pub fn turns(&self) -> usize {
        self.rows.iter().filter(|r| r.trade).count()
    }

    pub fn final_equity(&self) -> f64 {
        self.rows.last().map(|r| r.equity).unwrap_or(0.0)
    }

    pub fn equity_points(&self) -> Vec<EquityPoint> {
        self.rows
            .iter()
            .map(|r| EquityPoint {
                datetime: r.datetime,
                pnl: r.pnl,
                equity: r.equity,
            })
            .collect()
    }
}

/// Run the backtest for one symbol on aligned bar and signal series.
pub fn backtest_symbol(
    symbol: &str,
    bars: &[Bar],
    signals: &[SignalPoint],
    config: &BacktestConfig,
) -> Result<BacktestFrame, EngineError> {
    config.validate()?;
    validate_alignment(bars, signals)?;

    if bars.is_empty() {
        return Ok(BacktestFrame {
            symbol: symbol.to_string(),
            ..Default::default()
        });
    }

    let raw_signals: Vec<f64> = signals.iter().map(|s| s.signal).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<NaiveDate> = bars.iter().map(Bar::date).collect();

    let positions = resolve_positions(&raw_signals);
    let records = compute_pnl(&closes, &positions, config.qty(), config.cost_rate());
    let raw_pnl: Vec<f64> = records.iter().map(|r| r.pnl).collect();
    let stopped = apply_daily_stop(&dates, &raw_pnl, config.daily_loss_limit());
    let equity = equity_curve(&stopped.pnl);

    let rows = bars
        .iter()
        .enumerate()
        .map(|(t, bar)| BacktestRow {
            datetime: bar.datetime,
            close: bar.close,
            signal: raw_signals[t],
            position: positions.positions[t],
            trade: positions.trade_flags[t],
            ret: records[t].ret,
            gross_pnl: records[t].gross_pnl,
            cost: records[t].cost,
            raw_pnl: raw_pnl[t],
            pnl: stopped.pnl[t],
            equity: equity[t],
        })
        .collect();

    Ok(BacktestFrame {
        symbol: symbol.to_string(),
        rows,
        stops: stopped.stops,
    })
}

/// Convenience wrapper for rows produced by the signal generator.
pub fn backtest_signal_bars(
    symbol: &str,
    rows: &[SignalBar],
    config: &BacktestConfig,
) -> Result<BacktestFrame, EngineError> {
    let (bars, signals) = split_signal_bars(rows);
    backtest_symbol(symbol, &bars, &signals, config)
}

/// Check 1:1 timestamp alignment and strictly ascending bar order.
pub fn validate_alignment(bars: &[Bar], signals: &[SignalPoint]) -> Result<(), EngineError> {
    if bars.len() != signals.len() {
        return Err(EngineError::LengthMismatch {
            bars: bars.len(),
            signals: signals.len(),
        });
    }
    for (index, (bar, sig)) in bars.iter().zip(signals).enumerate() {
        if bar.datetime != sig.datetime {
            return Err(EngineError::MisalignedSeries {
                index,
                bar: bar.datetime,
                signal: sig.datetime,
            });
        }
    }
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].datetime <= pair[0].datetime {
            return Err(EngineError::UnorderedBars {
                index: i + 1,
                datetime: pair[1].datetime,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn bar(dt: NaiveDateTime, close: f64) -> Bar {
        Bar {
            symbol: "INFY".into(),
            datetime: dt,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
        }
    }

    fn series(closes: &[f64], sigs: &[f64]) -> (Vec<Bar>, Vec<SignalPoint>) {
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(ts(6, 9, 15) + chrono::Duration::minutes(3 * i as i64), c))
            .collect();
        let signals = bars
            .iter()
            .zip(sigs)
            .map(|(b, &s)| SignalPoint {
                datetime: b.datetime,
                signal: s,
            })
            .collect();
        (bars, signals)
    }

    #[test]
    fn empty_input_returns_empty_frame() {
        let frame = backtest_symbol("INFY", &[], &[], &BacktestConfig::default()).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.symbol, "INFY");
        assert_eq!(frame.final_equity(), 0.0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let (bars, mut sigs) = series(&[100.0, 101.0], &[0.0, 1.0]);
        sigs.pop();
        let err = backtest_symbol("INFY", &bars, &sigs, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::LengthMismatch {
                bars: 2,
                signals: 1
            }
        ));
    }

    #[test]
    fn misaligned_timestamp_is_rejected() {
        let (bars, mut sigs) = series(&[100.0, 101.0, 102.0], &[0.0, 1.0, 0.0]);
        sigs[1].datetime = ts(6, 12, 0);
        let err = backtest_symbol("INFY", &bars, &sigs, &BacktestConfig::default()).unwrap_err();
        match err {
            EngineError::MisalignedSeries { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unordered_bars_are_rejected() {
        let (mut bars, _) = series(&[100.0, 101.0], &[0.0, 0.0]);
        bars.swap(0, 1);
        let sigs: Vec<SignalPoint> = bars
            .iter()
            .map(|b| SignalPoint {
                datetime: b.datetime,
                signal: 0.0,
            })
            .collect();
        let err = backtest_symbol("INFY", &bars, &sigs, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::UnorderedBars { index: 1, .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (bars, sigs) = series(&[100.0], &[0.0]);
        let cfg = BacktestConfig {
            qty_per_trade: 0,
            ..Default::default()
        };
        let err = backtest_symbol("INFY", &bars, &sigs, &cfg).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn equity_is_cumsum_of_stopped_pnl() {
        let (bars, sigs) = series(&[100.0, 102.0, 101.0, 104.0], &[1.0, 0.0, -1.0, 0.0]);
        let frame = backtest_symbol("INFY", &bars, &sigs, &BacktestConfig::default()).unwrap();
        let mut acc = 0.0;
        for row in &frame.rows {
            acc += row.pnl;
            assert_eq!(row.equity, acc);
        }
        assert_eq!(frame.turns(), 2);
    }

    #[test]
    fn stop_leaves_raw_pnl_visible() {
        // 1000 shares long from bar 0; a 2% drop costs ~2000 > 600
        let (bars, sigs) = series(&[100.0, 98.0, 99.0, 100.0], &[1.0, 0.0, 0.0, 0.0]);
        let cfg = BacktestConfig {
            qty_per_trade: 1_000,
            transaction_cost_bps: 0.0,
            ..Default::default()
        };
        let frame = backtest_symbol("INFY", &bars, &sigs, &cfg).unwrap();
        assert_eq!(frame.stops.len(), 1);
        assert_eq!(frame.stops[0].trigger_index, 1);
        assert_eq!(frame.rows[2].pnl, 0.0);
        assert!(frame.rows[2].raw_pnl > 0.0);
        assert_eq!(frame.rows[1].pnl, frame.rows[1].raw_pnl);
    }

    #[test]
    fn equity_points_mirror_rows() {
        let (bars, sigs) = series(&[100.0, 101.0], &[1.0, 0.0]);
        let frame = backtest_symbol("INFY", &bars, &sigs, &BacktestConfig::default()).unwrap();
        let pts = frame.equity_points();
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].equity, frame.rows[1].equity);
        assert_eq!(pts[0].datetime, bars[0].datetime);
    }
}
