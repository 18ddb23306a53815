//! Daily stop-loss: truncates a calendar day once its loss limit is breached.
//!
//! Bars are grouped by calendar day. Within a day, the first bar whose
//! cumulative PnL is at or below `-loss_limit` keeps its own PnL; every later
//! bar of that day is zeroed. Days never influence each other.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A day on which the stop fired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyStop {
    pub date: NaiveDate,
    /// Index (into the full series) of the bar that breached the limit.
    pub trigger_index: usize,
    /// Intraday cumulative PnL at the trigger bar.
    pub cumulative_pnl: f64,
    /// Number of later bars whose PnL was zeroed.
    pub bars_zeroed: usize,
}

/// Stopped PnL series plus the days the stop fired on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub pnl: Vec<f64>,
    pub stops: Vec<DailyStop>,
}

/// Apply the daily stop to `pnl`, grouping bars by `dates`.
///
/// `loss_limit` is the positive amount (`capital * daily_stop_fraction`).
/// Output has the same length and order as the input.
pub fn apply_daily_stop(dates: &[NaiveDate], pnl: &[f64], loss_limit: f64) -> StopOutcome {
    debug_assert_eq!(dates.len(), pnl.len());
    let threshold = -loss_limit;

    let mut by_day: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, &d) in dates.iter().enumerate() {
        by_day.entry(d).or_default().push(i);
    }

    let mut out = pnl.to_vec();
    let mut stops = Vec::new();

    for (date, indices) in by_day {
        let mut cum = 0.0_f64;
        let trigger = indices.iter().position(|&i| {
            cum += pnl[i];
            cum <= threshold
        });

        let Some(k) = trigger else { continue };
        let later = &indices[k + 1..];
        for &i in later {
            out[i] = 0.0;
        }

        tracing::debug!(
            %date,
            trigger_index = indices[k],
            cumulative_pnl = cum,
            bars_zeroed = later.len(),
            "daily stop hit"
        );
        stops.push(DailyStop {
            date,
            trigger_index: indices[k],
            cumulative_pnl: cum,
            bars_zeroed: later.len(),
        });
    }

    StopOutcome { pnl: out, stops }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn no_breach_passes_through() {
        let dates = vec![day(4); 4];
        let pnl = vec![-100.0, 50.0, -200.0, 10.0];
        let out = apply_daily_stop(&dates, &pnl, 600.0);
        assert_eq!(out.pnl, pnl);
        assert!(out.stops.is_empty());
    }

    #[test]
    fn exact_threshold_triggers_and_keeps_trigger_bar() {
        let dates = vec![day(4); 5];
        let pnl = vec![-100.0, -200.0, -300.0, 50.0, 25.0];
        let out = apply_daily_stop(&dates, &pnl, 600.0);
        assert_eq!(out.pnl, vec![-100.0, -200.0, -300.0, 0.0, 0.0]);
        assert_eq!(out.stops.len(), 1);
        assert_eq!(out.stops[0].trigger_index, 2);
        assert_eq!(out.stops[0].bars_zeroed, 2);
        assert_eq!(out.stops[0].cumulative_pnl, -600.0);
    }

    #[test]
    fn first_bar_breach_zeroes_rest_of_day() {
        let dates = vec![day(4); 3];
        let pnl = vec![-700.0, 400.0, 400.0];
        let out = apply_daily_stop(&dates, &pnl, 600.0);
        assert_eq!(out.pnl, vec![-700.0, 0.0, 0.0]);
    }

    #[test]
    fn single_bar_day_has_nothing_to_zero() {
        let out = apply_daily_stop(&[day(4)], &[-900.0], 600.0);
        assert_eq!(out.pnl, vec![-900.0]);
        assert_eq!(out.stops[0].bars_zeroed, 0);
    }

    #[test]
    fn recovery_after_trigger_is_still_zeroed() {
        let dates = vec![day(4); 4];
        let pnl = vec![-300.0, -301.0, 1_000.0, -5.0];
        let out = apply_daily_stop(&dates, &pnl, 600.0);
        assert_eq!(out.pnl, vec![-300.0, -301.0, 0.0, 0.0]);
    }

    #[test]
    fn state_resets_each_day() {
        let dates = vec![day(4), day(4), day(5), day(5), day(5)];
        let pnl = vec![-500.0, -50.0, -50.0, -50.0, 20.0];
        let out = apply_daily_stop(&dates, &pnl, 600.0);
        // day 4 ends at -550, day 5 starts from zero
        assert_eq!(out.pnl, pnl);
    }

    #[test]
    fn empty_series() {
        let out = apply_daily_stop(&[], &[], 600.0);
        assert!(out.pnl.is_empty());
        assert!(out.stops.is_empty());
    }
}
