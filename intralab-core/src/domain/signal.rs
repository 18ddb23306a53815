//! Signal series types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Bar;

/// Directional instruction for one bar: `+1` long, `-1` short, `0` no new instruction.
///
/// NaN is accepted on input and treated exactly like `0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub datetime: NaiveDateTime,
    pub signal: f64,
}

/// A bar annotated with the signal generator's output.
///
/// This is the row shape of a `{symbol}_signals.csv` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBar {
    pub bar: Bar,
    pub signal: f64,
    /// Rolling z-score that produced the signal (0 during warmup).
    pub z: f64,
}

impl SignalBar {
    pub fn signal_point(&self) -> SignalPoint {
        SignalPoint {
            datetime: self.bar.datetime,
            signal: self.signal,
        }
    }
}

/// Split annotated rows into the bar series and the aligned signal series.
pub fn split_signal_bars(rows: &[SignalBar]) -> (Vec<Bar>, Vec<SignalPoint>) {
    let bars = rows.iter().map(|r| r.bar.clone()).collect();
    let signals = rows.iter().map(SignalBar::signal_point).collect();
    (bars, signals)
}

/// True when a signal value carries a non-zero, non-NaN instruction.
pub(crate) fn is_active(signal: f64) -> bool {
    !signal.is_nan() && signal != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, min, 0)
            .unwrap()
    }

    #[test]
    fn nan_is_inactive() {
        assert!(!is_active(f64::NAN));
        assert!(!is_active(0.0));
    }

    #[test]
    fn short_is_active() {
        assert!(is_active(-1.0));
    }

    #[test]
    fn split_keeps_alignment() {
        let rows: Vec<SignalBar> = [0.0, 1.0, -1.0]
            .iter()
            .enumerate()
            .map(|(i, &s)| SignalBar {
                bar: Bar {
                    symbol: "TCS".into(),
                    datetime: ts(15 + 3 * i as u32),
                    open: 10.0,
                    high: 11.0,
                    low: 9.0,
                    close: 10.5,
                    volume: 100.0,
                },
                signal: s,
                z: 0.0,
            })
            .collect();

        let (bars, signals) = split_signal_bars(&rows);
        assert_eq!(bars.len(), 3);
        for (b, s) in bars.iter().zip(&signals) {
            assert_eq!(b.datetime, s.datetime);
        }
        assert_eq!(signals[2].signal, -1.0);
    }
}
