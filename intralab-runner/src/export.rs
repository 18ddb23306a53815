//! Reporting and export: CSV and JSON artifacts.
//!
//! - `{symbol}_equity.csv`: `datetime,eq,pnl` per bar
//! - `summary.csv`: `trades,net_pnl,daily_sharpe,max_drawdown,symbol` per symbol
//! - `summary.json`: full `SymbolResult` list with schema versioning
//! - `tuning_results.csv`: every grid point of every tuned symbol
//!
//! Persisted JSON carries a `schema_version` field. Unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use intralab_core::{BacktestFrame, SymbolMetrics};

use crate::runner::{SymbolResult, UniverseRun, SCHEMA_VERSION};
use crate::store::DATETIME_FORMAT;
use crate::tune::TuningRow;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize symbol results to pretty JSON.
pub fn export_json(results: &[SymbolResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("failed to serialize results to JSON")
}

/// Deserialize symbol results, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<Vec<SymbolResult>> {
    let results: Vec<SymbolResult> =
        serde_json::from_str(json).context("failed to deserialize results from JSON")?;
    for r in &results {
        if r.schema_version > SCHEMA_VERSION {
            bail!(
                "unsupported schema version {} for {} (max supported: {})",
                r.schema_version,
                r.symbol,
                SCHEMA_VERSION
            );
        }
    }
    Ok(results)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Equity curve as CSV: `datetime,eq,pnl`.
pub fn export_equity_csv(frame: &BacktestFrame) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["datetime", "eq", "pnl"])?;
    for row in &frame.rows {
        wtr.write_record([
            row.datetime.format(DATETIME_FORMAT).to_string(),
            row.equity.to_string(),
            row.pnl.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Per-symbol summary: `trades,net_pnl,daily_sharpe,max_drawdown,symbol`.
pub fn export_summary_csv(metrics: &[SymbolMetrics]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trades", "net_pnl", "daily_sharpe", "max_drawdown", "symbol"])?;
    for m in metrics {
        wtr.write_record([
            m.trades.to_string(),
            m.net_pnl.to_string(),
            m.daily_sharpe.to_string(),
            m.max_drawdown.to_string(),
            m.symbol.clone(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Tuning rows: `symbol,win,z,trades,net_pnl,daily_sharpe,max_drawdown`.
pub fn export_tuning_csv(rows: &[TuningRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundles ───────────────────────────────────────────────

/// Write equity curves, `summary.csv`, and `summary.json` under `output_dir`.
///
/// Returns the path of `summary.csv`, or `None` when there was nothing to report.
pub fn save_backtest_artifacts(run: &UniverseRun, output_dir: &Path) -> Result<Option<PathBuf>> {
    if run.results.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    for result in &run.results {
        let path = output_dir.join(format!("{}_equity.csv", result.symbol));
        let csv = export_equity_csv(&result.frame)?;
        std::fs::write(&path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let summary_path = output_dir.join("summary.csv");
    std::fs::write(&summary_path, export_summary_csv(&run.metrics())?)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;

    let json_path = output_dir.join("summary.json");
    std::fs::write(&json_path, export_json(&run.results)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    Ok(Some(summary_path))
}

/// Write `tuning_results.csv` under `output_dir`; `None` when `rows` is empty.
pub fn save_tuning_results(rows: &[TuningRow], output_dir: &Path) -> Result<Option<PathBuf>> {
    if rows.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let path = output_dir.join("tuning_results.csv");
    std::fs::write(&path, export_tuning_csv(rows)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(Some(path))
}

/// Load results from a `summary.json`.
pub fn load_summary_json(path: &Path) -> Result<Vec<SymbolResult>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
