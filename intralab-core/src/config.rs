//! Backtest configuration value object.
//!
//! Passed explicitly into every engine call. `Default` gives the desk
//! parameters: 60k capital, 1% daily stop (600), 3 bps per turn, 15 shares.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("capital must be positive and finite, got {0}")]
    Capital(f64),

    #[error("daily_stop_fraction must be in (0, 1], got {0}")]
    DailyStopFraction(f64),

    #[error("transaction_cost_bps must be non-negative and finite, got {0}")]
    TransactionCost(f64),

    #[error("qty_per_trade must be > 0")]
    Quantity,
}

/// Parameters of a single-symbol backtest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Capital base the daily stop is measured against.
    pub capital: f64,
    /// Fraction of capital that may be lost in one calendar day.
    pub daily_stop_fraction: f64,
    /// Flat cost per position change, in basis points of notional.
    pub transaction_cost_bps: f64,
    /// Fixed number of shares per position.
    pub qty_per_trade: u32,
}

impl BacktestConfig {
    pub const DEFAULT_CAPITAL: f64 = 60_000.0;
    pub const DEFAULT_DAILY_STOP_FRACTION: f64 = 0.01;
    pub const DEFAULT_TRANSACTION_COST_BPS: f64 = 3.0;
    pub const DEFAULT_QTY_PER_TRADE: u32 = 15;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.capital.is_finite() && self.capital > 0.0) {
            return Err(ConfigError::Capital(self.capital));
        }
        if !(self.daily_stop_fraction > 0.0 && self.daily_stop_fraction <= 1.0) {
            return Err(ConfigError::DailyStopFraction(self.daily_stop_fraction));
        }
        if !(self.transaction_cost_bps.is_finite() && self.transaction_cost_bps >= 0.0) {
            return Err(ConfigError::TransactionCost(self.transaction_cost_bps));
        }
        if self.qty_per_trade == 0 {
            return Err(ConfigError::Quantity);
        }
        Ok(())
    }

    /// Loss limit per calendar day, as a positive amount (`capital * fraction`).
    pub fn daily_loss_limit(&self) -> f64 {
        self.capital * self.daily_stop_fraction
    }

    /// Cost rate applied to notional on a trade bar.
    pub fn cost_rate(&self) -> f64 {
        self.transaction_cost_bps / 1e4
    }

    pub fn qty(&self) -> f64 {
        f64::from(self.qty_per_trade)
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            capital: Self::DEFAULT_CAPITAL,
            daily_stop_fraction: Self::DEFAULT_DAILY_STOP_FRACTION,
            transaction_cost_bps: Self::DEFAULT_TRANSACTION_COST_BPS,
            qty_per_trade: Self::DEFAULT_QTY_PER_TRADE,
        }
    }
}
