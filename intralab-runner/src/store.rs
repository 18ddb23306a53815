//! CSV bar store: raw and processed bar files, signal files, universe file.
//!
//! Layout (all paths configurable):
//! - `raw/{SYMBOL}[_suffix].csv`: 1-minute bars
//! - `processed/{SYMBOL}[_suffix]_3min.csv`: 3-minute bars
//! - `processed/{SYMBOL}_signals.csv`: 3-minute bars plus `signal,z`
//! - `active_symbols.csv`: ranked universe
//!
//! Bar files carry `symbol,datetime,open,high,low,close,volume`. The
//! `symbol` column may be absent; the file stem up to the first `_` is used
//! instead.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use intralab_core::data::UniverseEntry;
use intralab_core::domain::{Bar, SignalBar};

/// Timestamp layout used when writing bar and signal files.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors from the CSV store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{path} row {row}: unsupported datetime '{value}'")]
    Datetime {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("file not found: {0}")]
    Missing(PathBuf),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ─── Row shapes ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BarRecord {
    #[serde(default)]
    symbol: Option<String>,
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct SignalRecord {
    #[serde(default)]
    symbol: Option<String>,
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    signal: Option<f64>,
    #[serde(default)]
    z: Option<f64>,
}

#[derive(Debug, Serialize)]
struct BarRow<'a> {
    symbol: &'a str,
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Serialize)]
struct SignalRow<'a> {
    symbol: &'a str,
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    signal: f64,
    z: f64,
}

// ─── Parsing helpers ────────────────────────────────────────────────

/// Parse the datetime layouts found in bar files.
///
/// Offset-suffixed values keep their wall-clock time; the offset is dropped.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    None
}

/// Symbol encoded in a file name: the stem up to the first `_`.
pub fn symbol_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.split('_').next().unwrap_or_default().to_string()
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, StoreError> {
    if !path.exists() {
        return Err(StoreError::Missing(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    Ok(csv::Reader::from_reader(file))
}

fn create_writer(path: &Path) -> Result<csv::Writer<File>, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    Ok(csv::Writer::from_writer(file))
}

fn parse_row_datetime(path: &Path, row: usize, value: &str) -> Result<NaiveDateTime, StoreError> {
    parse_datetime(value).ok_or_else(|| StoreError::Datetime {
        path: path.to_path_buf(),
        row,
        value: value.to_string(),
    })
}

// ─── Bar files ──────────────────────────────────────────────────────

/// Read a bar file, sorted by datetime.
pub fn read_bars(path: &Path) -> Result<Vec<Bar>, StoreError> {
    let fallback = symbol_from_path(path);
    let mut reader = open_reader(path)?;
    let mut bars = Vec::new();
    for (i, record) in reader.deserialize::<BarRecord>().enumerate() {
        let r = record.map_err(|e| StoreError::csv(path, e))?;
        bars.push(Bar {
            symbol: r.symbol.filter(|s| !s.is_empty()).unwrap_or_else(|| fallback.clone()),
            datetime: parse_row_datetime(path, i + 1, &r.datetime)?,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        });
    }
    bars.sort_by_key(|b| b.datetime);
    Ok(bars)
}

pub fn write_bars(path: &Path, bars: &[Bar]) -> Result<(), StoreError> {
    let mut wtr = create_writer(path)?;
    for b in bars {
        wtr.serialize(BarRow {
            symbol: &b.symbol,
            datetime: b.datetime.format(DATETIME_FORMAT).to_string(),
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        })
        .map_err(|e| StoreError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| StoreError::io(path, e))
}

// ─── Signal files ───────────────────────────────────────────────────

/// Read a signal file, sorted by datetime. Missing `signal`/`z` cells read as 0.
pub fn read_signal_bars(path: &Path) -> Result<Vec<SignalBar>, StoreError> {
    let fallback = symbol_from_path(path);
    let mut reader = open_reader(path)?;
    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<SignalRecord>().enumerate() {
        let r = record.map_err(|e| StoreError::csv(path, e))?;
        rows.push(SignalBar {
            bar: Bar {
                symbol: r.symbol.filter(|s| !s.is_empty()).unwrap_or_else(|| fallback.clone()),
                datetime: parse_row_datetime(path, i + 1, &r.datetime)?,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
            },
            signal: r.signal.unwrap_or(0.0),
            z: r.z.unwrap_or(0.0),
        });
    }
    rows.sort_by_key(|r| r.bar.datetime);
    Ok(rows)
}

pub fn write_signal_bars(path: &Path, rows: &[SignalBar]) -> Result<(), StoreError> {
    let mut wtr = create_writer(path)?;
    for r in rows {
        wtr.serialize(SignalRow {
            symbol: &r.bar.symbol,
            datetime: r.bar.datetime.format(DATETIME_FORMAT).to_string(),
            open: r.bar.open,
            high: r.bar.high,
            low: r.bar.low,
            close: r.bar.close,
            volume: r.bar.volume,
            signal: r.signal,
            z: r.z,
        })
        .map_err(|e| StoreError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| StoreError::io(path, e))
}

// ─── Universe file ──────────────────────────────────────────────────

pub fn write_universe(path: &Path, entries: &[UniverseEntry]) -> Result<(), StoreError> {
    let mut wtr = create_writer(path)?;
    for e in entries {
        wtr.serialize(e).map_err(|err| StoreError::csv(path, err))?;
    }
    wtr.flush().map_err(|e| StoreError::io(path, e))
}

pub fn read_universe(path: &Path) -> Result<Vec<UniverseEntry>, StoreError> {
    let mut reader = open_reader(path)?;
    reader
        .deserialize::<UniverseEntry>()
        .map(|r| r.map_err(|e| StoreError::csv(path, e)))
        .collect()
}

/// Symbols of the universe file, in ranked order.
pub fn read_universe_symbols(path: &Path) -> Result<Vec<String>, StoreError> {
    Ok(read_universe(path)?.into_iter().map(|e| e.symbol).collect())
}

// ─── Store ──────────────────────────────────────────────────────────

/// Anything that can hand out a symbol's signal-annotated bars.
///
/// `Ok(None)` means the symbol has no input and should be skipped.
pub trait SignalSource: Sync {
    fn signal_bars(&self, symbol: &str) -> Result<Option<Vec<SignalBar>>, StoreError>;
}

/// Anything that can hand out a symbol's 3-minute bars.
pub trait BarSource: Sync {
    fn bars_3min(&self, symbol: &str) -> Result<Option<Vec<Bar>>, StoreError>;
}

/// File-backed store over the raw and processed directories.
#[derive(Debug, Clone)]
pub struct BarStore {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl BarStore {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// All `*.csv` files in the raw directory, sorted by name.
    pub fn raw_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        list_csv(&self.raw_dir)
    }

    /// Newest 3-minute file for `symbol`.
    ///
    /// Candidates are `{symbol}_3min.csv` and `{symbol}_*_3min.csv`; the lexicographically last one
    /// wins. Falls back to `{symbol}.csv` in the processed directory.
    /// `SBI` never picks up `SBIN_3min.csv`.
    pub fn latest_3min(&self, symbol: &str) -> Result<Option<PathBuf>, StoreError> {
        let prefix = format!("{symbol}_");
        let files = list_csv(&self.processed_dir)?;
        let latest = files
            .iter()
            .rev()
            .find(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with("_3min.csv"))
            })
            .cloned();
        if latest.is_some() {
            return Ok(latest);
        }
        let plain = self.processed_dir.join(format!("{symbol}.csv"));
        Ok(plain.exists().then_some(plain))
    }

    pub fn signals_path(&self, symbol: &str) -> PathBuf {
        self.processed_dir.join(format!("{symbol}_signals.csv"))
    }

    pub fn save_signals(&self, symbol: &str, rows: &[SignalBar]) -> Result<PathBuf, StoreError> {
        let path = self.signals_path(symbol);
        write_signal_bars(&path, rows)?;
        Ok(path)
    }
}

impl BarSource for BarStore {
    fn bars_3min(&self, symbol: &str) -> Result<Option<Vec<Bar>>, StoreError> {
        match self.latest_3min(symbol)? {
            Some(path) => read_bars(&path).map(Some),
            None => Ok(None),
        }
    }
}

impl SignalSource for BarStore {
    fn signal_bars(&self, symbol: &str) -> Result<Option<Vec<SignalBar>>, StoreError> {
        let path = self.signals_path(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let rows = read_signal_bars(&path)?;
        Ok((!rows.is_empty()).then_some(rows))
    }
}

fn list_csv(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
        let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
