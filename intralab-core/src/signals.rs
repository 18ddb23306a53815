//! Mean-reversion signal: fade large standardized moves.
//!
//! The rolling z-score of bar returns is computed over `win` bars; a return
//! far below its recent mean opens a long, far above opens a short.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, SignalBar};
use crate::engine::bar_returns;

/// Added to the rolling std so a flat window does not divide by zero.
const STD_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("window must be >= 1")]
    Window,

    #[error("z threshold must be positive and finite, got {0}")]
    Threshold(f64),
}

/// Parameters of the mean-reversion model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanRevParams {
    pub win: usize,
    pub z: f64,
}

impl MeanRevParams {
    pub fn new(win: usize, z: f64) -> Result<Self, SignalError> {
        let params = Self { win, z };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        if self.win == 0 {
            return Err(SignalError::Window);
        }
        if !(self.z.is_finite() && self.z > 0.0) {
            return Err(SignalError::Threshold(self.z));
        }
        Ok(())
    }
}

impl Default for MeanRevParams {
    fn default() -> Self {
        Self { win: 20, z: 1.5 }
    }
}

/// Rolling z-score: `(x - mean) / (population std + 1e-9)` over `win` values.
///
/// The first `win - 1` outputs are NaN. NaN inside a window propagates.
pub fn zscore(values: &[f64], win: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if win == 0 {
        return out;
    }
    for t in (win - 1)..values.len() {
        let window = &values[t + 1 - win..=t];
        let mean = window.iter().sum::<f64>() / win as f64;
        let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / win as f64;
        out[t] = (values[t] - mean) / (var.sqrt() + STD_EPSILON);
    }
    out
}

/// Annotate bars with the mean-reversion signal.
///
/// Bars are sorted by datetime first. Warmup z-scores are reported as 0.
pub fn mean_reversion(bars: &[Bar], params: &MeanRevParams) -> Result<Vec<SignalBar>, SignalError> {
    params.validate()?;

    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|b| b.datetime);

    let closes: Vec<f64> = sorted.iter().map(|b| b.close).collect();
    let zs = zscore(&bar_returns(&closes), params.win);

    Ok(sorted
        .into_iter()
        .zip(zs)
        .map(|(bar, z)| {
            let z = if z.is_nan() { 0.0 } else { z };
            let signal = if z < -params.z {
                1.0
            } else if z > params.z {
                -1.0
            } else {
                0.0
            };
            SignalBar { bar, signal, z }
        })
        .collect())
}
