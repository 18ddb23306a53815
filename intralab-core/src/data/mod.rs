//! Bar preparation: resampling and universe ranking.

pub mod resample;
pub mod universe;

pub use resample::{bucket_start, resample, to_3min, ResampleError};
pub use universe::{day_stats, rank_universe, UniverseEntry};
