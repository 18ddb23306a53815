//! Parameter tuning: grid search over mean-reversion window and threshold.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use intralab_core::domain::Bar;
use intralab_core::{backtest_signal_bars, mean_reversion, BacktestConfig, MeanRevParams, SymbolMetrics};

use crate::model::ModelStore;
use crate::runner::RunError;
use crate::store::BarSource;

/// Parameter grid: every window paired with every threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub wins: Vec<usize>,
    pub zs: Vec<f64>,
}

impl Default for ParamGrid {
    /// Windows 10, 20, 30, 40 × thresholds 1.0, 1.5, 2.0.
    fn default() -> Self {
        Self {
            wins: vec![10, 20, 30, 40],
            zs: vec![1.0, 1.5, 2.0],
        }
    }
}

impl ParamGrid {
    pub fn size(&self) -> usize {
        self.wins.len() * self.zs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// All combinations, window-major.
    pub fn combinations(&self) -> Vec<MeanRevParams> {
        self.wins
            .iter()
            .flat_map(|&win| self.zs.iter().map(move |&z| MeanRevParams { win, z }))
            .collect()
    }
}

/// One evaluated grid point. Field order is the `tuning_results.csv` column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningRow {
    pub symbol: String,
    pub win: usize,
    pub z: f64,
    pub trades: usize,
    pub net_pnl: f64,
    pub daily_sharpe: f64,
    pub max_drawdown: f64,
}

impl TuningRow {
    fn new(params: &MeanRevParams, m: SymbolMetrics) -> Self {
        Self {
            symbol: m.symbol,
            win: params.win,
            z: params.z,
            trades: m.trades,
            net_pnl: m.net_pnl,
            daily_sharpe: m.daily_sharpe,
            max_drawdown: m.max_drawdown,
        }
    }

    pub fn params(&self) -> MeanRevParams {
        MeanRevParams {
            win: self.win,
            z: self.z,
        }
    }

    fn rank_key(&self) -> (f64, f64) {
        (self.net_pnl, self.daily_sharpe)
    }
}

/// Grid results for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTuning {
    pub symbol: String,
    /// One row per grid point, in grid order.
    pub rows: Vec<TuningRow>,
    /// Index into `rows` of the winner.
    pub best: Option<usize>,
}

impl SymbolTuning {
    pub fn best_row(&self) -> Option<&TuningRow> {
        self.best.map(|i| &self.rows[i])
    }
}

/// Outcome of tuning a universe.
#[derive(Debug, Clone, Default)]
pub struct TuningRun {
    pub symbols: Vec<SymbolTuning>,
    pub skipped: Vec<String>,
}

impl TuningRun {
    /// Every row of every symbol, in run order.
    pub fn all_rows(&self) -> Vec<TuningRow> {
        self.symbols.iter().flat_map(|s| s.rows.iter().cloned()).collect()
    }
}

/// Index of the best row: highest `(net_pnl, daily_sharpe)`, compared
/// lexicographically. An exact tie keeps the earlier row.
pub fn pick_best(rows: &[TuningRow]) -> Option<usize> {
    let mut best: Option<(usize, (f64, f64))> = None;
    for (i, row) in rows.iter().enumerate() {
        let key = row.rank_key();
        let better = match best {
            None => true,
            Some((_, current)) => key > current,
        };
        if better {
            best = Some((i, key));
        }
    }
    best.map(|(i, _)| i)
}

/// Grid-search executor.
pub struct TuningSweep {
    grid: ParamGrid,
    config: BacktestConfig,
    parallel: bool,
}

impl TuningSweep {
    pub fn new(grid: ParamGrid, config: BacktestConfig) -> Self {
        Self {
            grid,
            config,
            parallel: true,
        }
    }

    /// Enables or disables parallel evaluation of grid points.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    /// Evaluate every grid point on one symbol's bars.
    pub fn tune_symbol(&self, symbol: &str, bars: &[Bar]) -> Result<SymbolTuning, RunError> {
        let combos = self.grid.combinations();
        let eval = |params: &MeanRevParams| -> Result<TuningRow, RunError> {
            let rows = mean_reversion(bars, params)?;
            let frame = backtest_signal_bars(symbol, &rows, &self.config)?;
            Ok(TuningRow::new(params, SymbolMetrics::compute(&frame)))
        };

        let rows: Vec<TuningRow> = if self.parallel {
            combos.par_iter().map(eval).collect::<Result<Vec<_>, _>>()?
        } else {
            combos.iter().map(eval).collect::<Result<Vec<_>, _>>()?
        };

        let best = pick_best(&rows);
        if let Some(row) = best.map(|i| &rows[i]) {
            tracing::info!(
                symbol,
                win = row.win,
                z = row.z,
                net_pnl = row.net_pnl,
                daily_sharpe = row.daily_sharpe,
                "best parameters"
            );
        }
        Ok(SymbolTuning {
            symbol: symbol.to_string(),
            rows,
            best,
        })
    }

    /// Tune each symbol with 3-minute bars; persist winners to `models` if given.
    pub fn tune_universe(
        &self,
        symbols: &[String],
        source: &dyn BarSource,
        models: Option<&ModelStore>,
    ) -> Result<TuningRun, RunError> {
        self.config
            .validate()
            .map_err(intralab_core::EngineError::from)?;
        for params in self.grid.combinations() {
            params.validate()?;
        }

        let mut run = TuningRun::default();
        for symbol in symbols {
            let bars = match source.bars_3min(symbol)? {
                Some(bars) if !bars.is_empty() => bars,
                _ => {
                    tracing::warn!(symbol = %symbol, "no 3-min bars, skipping");
                    run.skipped.push(symbol.clone());
                    continue;
                }
            };
            let tuning = self.tune_symbol(symbol, &bars)?;
            if let (Some(store), Some(row)) = (models, tuning.best_row()) {
                store.save(symbol, &row.params())?;
            }
            run.symbols.push(tuning);
        }
        Ok(run)
    }
}
