//! PnL computation: lagged position × bar return × price × quantity, less costs.
//!
//! Every value is in account currency and left unrounded; rounding happens
//! only when metrics are reported.

use serde::{Deserialize, Serialize};

use super::position::PositionSeries;

/// Per-bar PnL components before the daily stop is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlRecord {
    /// Simple close-to-close return (0 on the first bar).
    pub ret: f64,
    pub gross_pnl: f64,
    pub cost: f64,
    pub pnl: f64,
}

/// Simple close-to-close returns; bar 0 is 0.
///
/// A non-finite return (zero or missing prior close) is recorded as 0.
pub fn bar_returns(closes: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(closes.len());
    for (t, &close) in closes.iter().enumerate() {
        if t == 0 {
            out.push(0.0);
            continue;
        }
        let r = close / closes[t - 1] - 1.0;
        out.push(if r.is_finite() { r } else { 0.0 });
    }
    out
}

/// Compute per-bar PnL from closes and a resolved position series.
///
/// `gross[t] = position[t-1] * ret[t] * close[t] * qty`
/// `cost[t]  = cost_rate * close[t] * qty` on trade bars, else 0.
pub fn compute_pnl(
    closes: &[f64],
    positions: &PositionSeries,
    qty: f64,
    cost_rate: f64,
) -> Vec<PnlRecord> {
    debug_assert_eq!(closes.len(), positions.len());
    let returns = bar_returns(closes);

    closes
        .iter()
        .zip(returns)
        .enumerate()
        .map(|(t, (&close, ret))| {
            let gross_pnl = positions.lagged(t) * ret * close * qty;
            let cost = if positions.trade_flags[t] {
                cost_rate * close * qty
            } else {
                0.0
            };
            PnlRecord {
                ret,
                gross_pnl,
                cost,
                pnl: gross_pnl - cost,
            }
        })
        .collect()
}

/// Running cumulative sum of PnL.
pub fn equity_curve(pnl: &[f64]) -> Vec<f64> {
    pnl.iter()
        .scan(0.0_f64, |acc, &p| {
            *acc += p;
            Some(*acc)
        })
        .collect()
}
