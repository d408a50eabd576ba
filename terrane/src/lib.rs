//! # Terrane Query Layer
//! Pull-based execution operators and selectivity statistics over the
//! `strata` storage engine. Operators share one open/has_next/next/rewind
//! protocol and compose into trees whose leaves are sequential scans; the
//! statistics module builds per-column equi-width histograms that feed scan
//! cost and cardinality estimates.

pub mod errors;
pub mod exec;
pub mod optimizer;
pub mod predicate;

pub use errors::{ExecutionError, Result};
pub use predicate::{JoinPredicate, Op, Predicate};
