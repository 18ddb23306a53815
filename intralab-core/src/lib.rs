//! intralab core: intraday backtest engine, domain types, signals.
//!
//! This crate contains the pure computation of the pipeline:
//! - Domain types (bars, signal points, annotated signal bars)
//! - Position resolution (forward-filled signals, trade-bar flags)
//! - PnL with flat basis-point costs and a cumulative equity curve
//! - Daily capital-based stop-loss
//! - Summary metrics (trades, net PnL, daily Sharpe, max drawdown)
//! - Mean-reversion signal, 3-minute resampling, universe ranking
//!
//! No file or network I/O happens here.

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod metrics;
pub mod signals;

pub use config::{BacktestConfig, ConfigError};
pub use engine::{backtest_signal_bars, backtest_symbol, BacktestFrame, EngineError};
pub use metrics::SymbolMetrics;
pub use signals::{mean_reversion, MeanRevParams};
