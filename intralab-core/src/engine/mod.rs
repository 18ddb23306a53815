//! Backtest engine: position resolver → PnL → daily stop → equity.

pub mod backtest;
pub mod daily_stop;
pub mod pnl;
pub mod position;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::config::ConfigError;

pub use backtest::{
    backtest_signal_bars, backtest_symbol, validate_alignment, BacktestFrame, BacktestRow,
    EquityPoint,
};
pub use daily_stop::{apply_daily_stop, DailyStop, StopOutcome};
pub use pnl::{bar_returns, compute_pnl, equity_curve, PnlRecord};
pub use position::{resolve_positions, PositionSeries};

/// Errors from the backtest engine. All are input-quality problems.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid backtest config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("bar series has {bars} rows but signal series has {signals}")]
    LengthMismatch { bars: usize, signals: usize },

    #[error("misaligned series at row {index}: bar {bar} vs signal {signal}")]
    MisalignedSeries {
        index: usize,
        bar: NaiveDateTime,
        signal: NaiveDateTime,
    },

    #[error("bars not strictly ascending at row {index} ({datetime})")]
    UnorderedBars {
        index: usize,
        datetime: NaiveDateTime,
    },
}
