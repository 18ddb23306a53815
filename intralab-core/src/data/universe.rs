//! Universe selection: rank symbols by last-session turnover and range.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Liquidity and range statistics for one symbol's most recent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    /// Σ close × volume over the last calendar day in the data.
    pub turnover: f64,
    /// (max high − min low) / first close of that day, in percent.
    pub range_pct: f64,
}

/// Compute turnover and range over the last calendar day present in `bars`.
pub fn day_stats(symbol: &str, bars: &[Bar]) -> UniverseEntry {
    let mut entry = UniverseEntry {
        symbol: symbol.to_string(),
        turnover: 0.0,
        range_pct: 0.0,
    };
    let Some(last_day) = bars.iter().map(Bar::date).max() else {
        return entry;
    };

    let mut day: Vec<&Bar> = bars.iter().filter(|b| b.date() == last_day).collect();
    day.sort_by_key(|b| b.datetime);

    entry.turnover = day.iter().map(|b| b.close * b.volume).sum();
    let high = day.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = day.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let first_close = day.first().map(|b| b.close).unwrap_or(0.0);
    entry.range_pct = (high - low) / first_close.max(1e-9) * 100.0;
    entry
}

/// Sort by turnover then range (both descending) and keep the top `top_n`.
pub fn rank_universe(mut entries: Vec<UniverseEntry>, top_n: usize) -> Vec<UniverseEntry> {
    entries.sort_by(|a, b| {
        b.turnover
            .total_cmp(&a.turnover)
            .then(b.range_pct.total_cmp(&a.range_pct))
    });
    entries.truncate(top_n);
    entries
}
