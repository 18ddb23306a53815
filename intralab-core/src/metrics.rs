//! Performance metrics: pure functions over a backtest frame.
//!
//! `trades` counts signal activations, not position changes; the cost model
//! counts the latter (see `BacktestFrame::turns`). Both are kept.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::signal::is_active;
use crate::engine::BacktestFrame;

/// Trading days per year used to annualise the daily Sharpe ratio.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary record for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetrics {
    pub symbol: String,
    pub trades: usize,
    pub net_pnl: f64,
    pub daily_sharpe: f64,
    pub max_drawdown: f64,
}

impl SymbolMetrics {
    /// The zero record reported for an empty series.
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            trades: 0,
            net_pnl: 0.0,
            daily_sharpe: 0.0,
            max_drawdown: 0.0,
        }
    }

    /// Compute all metrics from a finished backtest.
    pub fn compute(frame: &BacktestFrame) -> Self {
        if frame.is_empty() {
            return Self::empty(&frame.symbol);
        }
        let signals: Vec<f64> = frame.rows.iter().map(|r| r.signal).collect();
        let equity = frame.equity();
        let daily = daily_pnl(&frame.dates(), &frame.pnl());
        let daily_values: Vec<f64> = daily.iter().map(|(_, v)| *v).collect();

        Self {
            symbol: frame.symbol.clone(),
            trades: signal_trade_count(&signals),
            net_pnl: round2(frame.final_equity()),
            daily_sharpe: round2(daily_sharpe(&daily_values)),
            max_drawdown: round2(max_drawdown(&equity)),
        }
    }

    /// Ordering key used when picking between parameter sets.
    pub fn rank_key(&self) -> (f64, f64) {
        (self.net_pnl, self.daily_sharpe)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Number of bars carrying a non-zero signal.
pub fn signal_trade_count(signals: &[f64]) -> usize {
    signals.iter().filter(|&&s| is_active(s)).count()
}

/// Sum PnL per calendar day, ascending by date.
pub fn daily_pnl(dates: &[NaiveDate], pnl: &[f64]) -> Vec<(NaiveDate, f64)> {
    let mut days: std::collections::BTreeMap<NaiveDate, f64> = Default::default();
    for (d, p) in dates.iter().zip(pnl) {
        *days.entry(*d).or_insert(0.0) += p;
    }
    days.into_iter().collect()
}

/// Annualised Sharpe ratio of daily PnL: mean / sample std * sqrt(252).
///
/// Returns 0.0 when the sample std is zero or undefined (fewer than two days).
/// Constant days count as zero std even when float error says otherwise.
pub fn daily_sharpe(daily: &[f64]) -> f64 {
    let Some(&first) = daily.first() else {
        return 0.0;
    };
    if daily.len() < 2 || daily.iter().all(|&v| v == first) {
        return 0.0;
    }
    let std = std_dev(daily);
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    (mean_f64(daily) / std) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Largest drop of equity below its running maximum. Always >= 0.
///
/// The running maximum starts at the first equity value, not at zero.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        let dd = peak - eq;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Round to 2 decimals, ties to even.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
