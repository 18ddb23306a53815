//! Pipeline runner: wires the store, signal model, engine, and metrics.
//!
//! Entry points, one per pipeline stage:
//! - `resample_file()`: 1-minute CSV to N-minute CSV
//! - `build_universe()`: rank raw files, write the universe file
//! - `generate_signals()`: mean-reversion signals for each universe symbol
//! - `run_symbol()` / `run_universe()`: backtest signal files
//!
//! Tuning lives in `crate::tune`.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use intralab_core::data::{day_stats, rank_universe, resample, ResampleError, UniverseEntry};
use intralab_core::domain::{split_signal_bars, SignalBar};
use intralab_core::engine::DailyStop;
use intralab_core::fingerprint::dataset_hash;
use intralab_core::signals::SignalError;
use intralab_core::{
    backtest_symbol, mean_reversion, BacktestConfig, BacktestFrame, EngineError, MeanRevParams,
    SymbolMetrics,
};

use crate::model::ModelStore;
use crate::store::{
    read_bars, read_universe_symbols, write_bars, write_universe, BarSource, BarStore,
    SignalSource, StoreError,
};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    #[error("resample error: {0}")]
    Resample(#[from] ResampleError),
    #[error("universe file {0} lists no symbols")]
    EmptyUniverse(PathBuf),
}

/// Current schema version for persisted run summaries.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of backtesting one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub metrics: SymbolMetrics,
    /// BLAKE3 over the bars, signals and config that produced this result.
    pub dataset_hash: String,
    pub bar_count: usize,
    /// Bars on which the position changed.
    pub turns: usize,
    pub stops: Vec<DailyStop>,
    pub config: BacktestConfig,
    /// Per-bar output. Not persisted in JSON summaries; see `export_equity_csv`.
    #[serde(skip)]
    pub frame: BacktestFrame,
}

/// Outcome of a multi-symbol backtest.
#[derive(Debug, Clone, Default)]
pub struct UniverseRun {
    /// Results in universe order.
    pub results: Vec<SymbolResult>,
    /// Symbols with no signal input.
    pub skipped: Vec<String>,
}

impl UniverseRun {
    pub fn metrics(&self) -> Vec<SymbolMetrics> {
        self.results.iter().map(|r| r.metrics.clone()).collect()
    }
}

/// Symbols for which signals were written.
#[derive(Debug, Clone, Default)]
pub struct SignalRun {
    /// `(symbol, rows, path)` in universe order.
    pub written: Vec<(String, usize, PathBuf)>,
    pub skipped: Vec<String>,
}

// ─── Data preparation ───────────────────────────────────────────────

/// Resample a bar file into `minutes`-wide buckets. Returns the output row count.
pub fn resample_file(input: &Path, output: &Path, minutes: u32) -> Result<usize, RunError> {
    let bars = read_bars(input)?;
    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        tracing::warn!(input = %input.display(), insane, "bars failing OHLCV sanity checks");
    }
    let out = resample(&bars, minutes)?;
    write_bars(output, &out)?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        rows_in = bars.len(),
        rows_out = out.len(),
        minutes,
        "resampled"
    );
    Ok(out.len())
}

/// Rank every raw file by last-session turnover and range, keep `top_n`
/// distinct symbols, and write them to `universe_file`.
///
/// Unreadable or empty raw files are skipped. Nothing is written when no
/// raw file yields bars.
pub fn build_universe(
    store: &BarStore,
    top_n: usize,
    universe_file: &Path,
) -> Result<Vec<UniverseEntry>, RunError> {
    let mut candidates = Vec::new();
    for path in store.raw_files()? {
        let bars = match read_bars(&path) {
            Ok(bars) if !bars.is_empty() => bars,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable raw file");
                continue;
            }
        };
        let symbol = bars[0].symbol.clone();
        candidates.push(day_stats(&symbol, &bars));
    }

    let mut ranked = rank_universe(candidates, usize::MAX);
    let mut seen = std::collections::HashSet::new();
    ranked.retain(|e| seen.insert(e.symbol.clone()));
    ranked.truncate(top_n);

    if !ranked.is_empty() {
        write_universe(universe_file, &ranked)?;
        tracing::info!(
            symbols = ranked.len(),
            path = %universe_file.display(),
            "wrote universe"
        );
    }
    Ok(ranked)
}

/// Symbols listed in the universe file, in ranked order.
pub fn load_universe(universe_file: &Path) -> Result<Vec<String>, RunError> {
    let symbols = read_universe_symbols(universe_file)?;
    if symbols.is_empty() {
        return Err(RunError::EmptyUniverse(universe_file.to_path_buf()));
    }
    Ok(symbols)
}

// ─── Signals ────────────────────────────────────────────────────────

/// Compute mean-reversion signals for each symbol and write
/// `{symbol}_signals.csv` next to its 3-minute bars.
///
/// With `use_saved`, a symbol's saved model parameters take precedence over
/// `baseline`. The parameters actually used are saved back to `models`.
pub fn generate_signals(
    symbols: &[String],
    store: &BarStore,
    models: &ModelStore,
    baseline: &MeanRevParams,
    use_saved: bool,
) -> Result<SignalRun, RunError> {
    baseline.validate()?;
    let mut run = SignalRun::default();

    for symbol in symbols {
        let bars = match store.bars_3min(symbol)? {
            Some(bars) if !bars.is_empty() => bars,
            _ => {
                tracing::warn!(symbol = %symbol, "no 3-min bars, skipping");
                run.skipped.push(symbol.clone());
                continue;
            }
        };

        let params = if use_saved {
            models.load(symbol)?.unwrap_or(*baseline)
        } else {
            *baseline
        };
        let rows = mean_reversion(&bars, &params)?;
        models.save(symbol, &params)?;
        let path = store.save_signals(symbol, &rows)?;

        tracing::info!(
            symbol = %symbol,
            rows = rows.len(),
            win = params.win,
            z = params.z,
            path = %path.display(),
            "signals written"
        );
        run.written.push((symbol.clone(), rows.len(), path));
    }
    Ok(run)
}

// ─── Backtest ───────────────────────────────────────────────────────

/// Backtest one symbol's signal-annotated bars, no I/O.
pub fn run_symbol(
    symbol: &str,
    rows: &[SignalBar],
    config: &BacktestConfig,
) -> Result<SymbolResult, RunError> {
    let (bars, signals) = split_signal_bars(rows);
    let frame = backtest_symbol(symbol, &bars, &signals, config)?;
    let metrics = SymbolMetrics::compute(&frame);
    let hash = dataset_hash(&bars, &signals, config);

    tracing::info!(
        symbol,
        trades = metrics.trades,
        net_pnl = metrics.net_pnl,
        daily_sharpe = metrics.daily_sharpe,
        max_drawdown = metrics.max_drawdown,
        stops = frame.stops.len(),
        dataset = hash.short(),
        "backtest complete"
    );

    Ok(SymbolResult {
        schema_version: SCHEMA_VERSION,
        symbol: symbol.to_string(),
        dataset_hash: hash.0,
        bar_count: frame.len(),
        turns: frame.turns(),
        stops: frame.stops.clone(),
        config: *config,
        metrics,
        frame,
    })
}

/// Backtest every symbol the source has signals for.
///
/// Results keep the order of `symbols`. Symbols without input are listed in
/// `skipped`; any other error aborts the run.
pub fn run_universe(
    symbols: &[String],
    source: &dyn SignalSource,
    config: &BacktestConfig,
    parallel: bool,
) -> Result<UniverseRun, RunError> {
    config.validate().map_err(EngineError::from)?;

    let one = |symbol: &String| -> Result<Option<SymbolResult>, RunError> {
        match source.signal_bars(symbol)? {
            Some(rows) => run_symbol(symbol, &rows, config).map(Some),
            None => {
                tracing::warn!(symbol = %symbol, "no signals, skipping");
                Ok(None)
            }
        }
    };

    let outcomes: Vec<Option<SymbolResult>> = if parallel {
        symbols.par_iter().map(one).collect::<Result<Vec<_>, _>>()?
    } else {
        symbols.iter().map(one).collect::<Result<Vec<_>, _>>()?
    };

    let mut run = UniverseRun::default();
    for (symbol, outcome) in symbols.iter().zip(outcomes) {
        match outcome {
            Some(result) => run.results.push(result),
            None => run.skipped.push(symbol.clone()),
        }
    }
    Ok(run)
}
