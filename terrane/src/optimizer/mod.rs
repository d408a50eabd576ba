//! Selectivity statistics for cost estimation.

pub mod histogram;
pub mod stats;

pub use histogram::{IntHistogram, StringHistogram};
pub use stats::{StatsRegistry, TableStats, DEFAULT_IO_COST_PER_PAGE, NUM_HIST_BINS};
