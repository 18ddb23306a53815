//! Minute-bar resampling.
//!
//! Buckets start at multiples of `minutes` counted from midnight of each
//! bar's day. Aggregation is open=first, high=max, low=min, close=last,
//! volume=sum. Buckets with no input bars are not emitted.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResampleError {
    #[error("resample interval must be > 0 minutes")]
    ZeroInterval,
}

/// Start of the bucket containing `dt`.
pub fn bucket_start(dt: NaiveDateTime, minutes: u32) -> NaiveDateTime {
    let minute_of_day = dt.hour() * 60 + dt.minute();
    let floored = minute_of_day - minute_of_day % minutes;
    let time = NaiveTime::from_hms_opt(floored / 60, floored % 60, 0).unwrap_or(NaiveTime::MIN);
    dt.date().and_time(time)
}

/// Resample bars to `minutes`-wide buckets.
pub fn resample(bars: &[Bar], minutes: u32) -> Result<Vec<Bar>, ResampleError> {
    if minutes == 0 {
        return Err(ResampleError::ZeroInterval);
    }

    let mut sorted: Vec<&Bar> = bars.iter().collect();
    sorted.sort_by_key(|b| b.datetime);

    let mut output: Vec<Bar> = Vec::new();
    for bar in sorted {
        let start = bucket_start(bar.datetime, minutes);
        match output.last_mut() {
            Some(agg) if agg.datetime == start => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => output.push(Bar {
                datetime: start,
                ..bar.clone()
            }),
        }
    }
    Ok(output)
}

/// The 3-minute bars the signal and backtest stages run on.
pub fn to_3min(bars: &[Bar]) -> Vec<Bar> {
    // 3 is non-zero, so this cannot fail
    resample(bars, 3).unwrap_or_default()
}
