//! Runner configuration: one TOML file for every pipeline stage.
//!
//! Every section and every field is optional; missing values fall back to
//! the defaults the pipeline has always used.
//!
//! ```toml
//! [backtest]
//! capital = 60000.0
//! daily_stop_fraction = 0.01
//! transaction_cost_bps = 3.0
//! qty_per_trade = 15
//!
//! [signal]
//! win = 20
//! z = 1.5
//!
//! [universe]
//! top_n = 6
//!
//! [paths]
//! raw_dir = "data/raw"
//! processed_dir = "data/processed"
//! universe_file = "data/active_symbols.csv"
//! model_dir = "models"
//!
//! [tuning]
//! wins = [10, 20, 30, 40]
//! zs = [1.0, 1.5, 2.0]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use intralab_core::{BacktestConfig, ConfigError, MeanRevParams};
use intralab_core::signals::SignalError;

use crate::tune::ParamGrid;

/// Errors from loading or validating a runner config.
#[derive(Debug, Error)]
pub enum RunnerConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("[backtest] {0}")]
    Backtest(#[from] ConfigError),

    #[error("[signal] {0}")]
    Signal(#[from] SignalError),

    #[error("[universe] top_n must be >= 1")]
    TopN,

    #[error("[tuning] {0}")]
    Tuning(String),
}

/// Top-level runner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub backtest: BacktestConfig,
    /// Baseline mean-reversion parameters used by `signals`.
    pub signal: MeanRevParams,
    pub universe: UniverseSettings,
    pub paths: PathsConfig,
    pub tuning: ParamGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSettings {
    pub top_n: usize,
}

impl Default for UniverseSettings {
    fn default() -> Self {
        Self { top_n: 6 }
    }
}

/// On-disk layout of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// 1-minute bar files, one or more per symbol.
    pub raw_dir: PathBuf,
    /// 3-minute bar files and `{symbol}_signals.csv`.
    pub processed_dir: PathBuf,
    /// Ranked universe (`symbol,turnover,range_pct`).
    pub universe_file: PathBuf,
    /// `{symbol}_meanrev.json` parameter files.
    pub model_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            universe_file: PathBuf::from("data/active_symbols.csv"),
            model_dir: PathBuf::from("models"),
        }
    }
}

impl PathsConfig {
    /// Where `backtest` writes equity curves and the summary.
    pub fn equity_dir(&self) -> PathBuf {
        self.processed_dir.join("equity_curves")
    }

    /// Where `tune` writes `tuning_results.csv`.
    pub fn tuning_dir(&self) -> PathBuf {
        self.processed_dir.join("tuning")
    }
}

impl RunnerConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RunnerConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunnerConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, RunnerConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, RunnerConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), RunnerConfigError> {
        self.backtest.validate()?;
        self.signal.validate()?;
        if self.universe.top_n == 0 {
            return Err(RunnerConfigError::TopN);
        }
        if self.tuning.is_empty() {
            return Err(RunnerConfigError::Tuning(
                "wins and zs must both be non-empty".into(),
            ));
        }
        for params in self.tuning.combinations() {
            params
                .validate()
                .map_err(|e| RunnerConfigError::Tuning(e.to_string()))?;
        }
        Ok(())
    }
}
