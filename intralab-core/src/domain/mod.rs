//! Domain types for intralab

pub mod bar;
pub mod ids;
pub mod signal;

pub use bar::Bar;
pub use ids::DatasetHash;
pub use signal::{split_signal_bars, SignalBar, SignalPoint};
