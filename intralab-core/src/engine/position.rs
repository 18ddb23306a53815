//! Position resolution: sparse signals to a held position series.
//!
//! A zero (or NaN) signal carries the previously held position; a non-zero
//! signal replaces it. Before the first non-zero signal the position is flat.
//! Position at bar t is a function of signals 0..=t only.

use serde::{Deserialize, Serialize};

use crate::domain::signal::is_active;

/// Held position per bar plus the bars on which it changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSeries {
    pub positions: Vec<f64>,
    /// `true` at bar t iff `positions[t] != positions[t-1]` (with flat before bar 0).
    pub trade_flags: Vec<bool>,
}

impl PositionSeries {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position held entering bar t (the position established at t-1).
    pub fn lagged(&self, t: usize) -> f64 {
        if t == 0 {
            0.0
        } else {
            self.positions[t - 1]
        }
    }

    /// Number of bars charged transaction cost.
    pub fn turns(&self) -> usize {
        self.trade_flags.iter().filter(|&&f| f).count()
    }
}

/// Forward-fill non-zero signals into a position series and flag position changes.
pub fn resolve_positions(signals: &[f64]) -> PositionSeries {
    let mut positions = Vec::with_capacity(signals.len());
    let mut trade_flags = Vec::with_capacity(signals.len());
    let mut held = 0.0_f64;

    for &signal in signals {
        let prev = held;
        if is_active(signal) {
            held = signal;
        }
        positions.push(held);
        trade_flags.push(held != prev);
    }

    PositionSeries {
        positions,
        trade_flags,
    }
}
