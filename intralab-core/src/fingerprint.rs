//! Dataset fingerprinting: BLAKE3 over the exact inputs of a backtest.
//!
//! Two runs with the same fingerprint saw bit-identical bars, signals and
//! configuration, so their outputs must be bit-identical too.

use crate::config::BacktestConfig;
use crate::domain::{Bar, DatasetHash, SignalPoint};

/// Hash bars, signals and config into a `DatasetHash`.
///
/// Floats are hashed by their bit patterns; timestamps by their
/// `%Y-%m-%dT%H:%M:%S%.f` rendering.
pub fn dataset_hash(bars: &[Bar], signals: &[SignalPoint], config: &BacktestConfig) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&config.capital.to_bits().to_le_bytes());
    hasher.update(&config.daily_stop_fraction.to_bits().to_le_bytes());
    hasher.update(&config.transaction_cost_bps.to_bits().to_le_bytes());
    hasher.update(&config.qty_per_trade.to_le_bytes());

    hasher.update(&(bars.len() as u64).to_le_bytes());
    for bar in bars {
        hasher.update(bar.symbol.as_bytes());
        hasher.update(bar.datetime.format("%Y-%m-%dT%H:%M:%S%.f").to_string().as_bytes());
        for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }

    hasher.update(&(signals.len() as u64).to_le_bytes());
    for sig in signals {
        hasher.update(sig.datetime.format("%Y-%m-%dT%H:%M:%S%.f").to_string().as_bytes());
        hasher.update(&sig.signal.to_bits().to_le_bytes());
    }

    DatasetHash(hasher.finalize().to_hex().to_string())
}
