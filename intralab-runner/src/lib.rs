//! intralab runner: pipeline orchestration over the CSV store.
//!
//! This crate builds on `intralab-core` to provide:
//! - TOML runner configuration with per-section defaults
//! - CSV bar, signal and universe files, model-parameter JSON
//! - Resampling, universe building and signal generation stages
//! - Per-symbol and per-universe backtests (rayon, order preserved)
//! - Window/threshold grid tuning
//! - Equity-curve, summary and tuning artifacts

pub mod config;
pub mod export;
pub mod model;
pub mod runner;
pub mod store;
pub mod tune;

pub use config::{PathsConfig, RunnerConfig, RunnerConfigError, UniverseSettings};
pub use export::{
    export_equity_csv, export_json, export_summary_csv, export_tuning_csv, import_json,
    load_summary_json, save_backtest_artifacts, save_tuning_results,
};
pub use model::ModelStore;
pub use runner::{
    build_universe, generate_signals, load_universe, resample_file, run_symbol, run_universe,
    RunError, SignalRun, SymbolResult, UniverseRun, SCHEMA_VERSION,
};
pub use store::{BarSource, BarStore, SignalSource, StoreError};
pub use tune::{pick_best, ParamGrid, SymbolTuning, TuningRow, TuningRun, TuningSweep};
