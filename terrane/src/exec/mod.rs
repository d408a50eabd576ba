//! Pull-based execution operators.
//!
//! Every operator speaks the same protocol: `open` before anything else,
//! `has_next`/`next` to pull tuples, `rewind` to restart (equivalent to
//! close-then-open), `close` when done. `has_next` is idempotent but may
//! buffer one tuple ahead; `next` past the end is a `NoSuchElement` error.
//! Operators own their children outright, so an iterator tree is a tree.

use std::sync::Arc;

use strata::{Tuple, TupleDesc};

use crate::errors::Result;

pub mod aggregate;
pub mod delete;
pub mod filter;
pub mod insert;
pub mod join;
pub mod scan;
pub mod tuple_iterator;

pub use aggregate::{AggOp, Aggregate};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use scan::SeqScan;
pub use tuple_iterator::TupleIterator;

pub trait Operator {
    fn open(&mut self) -> Result<()>;

    fn close(&mut self);

    fn has_next(&mut self) -> Result<bool>;

    fn next(&mut self) -> Result<Tuple>;

    fn rewind(&mut self) -> Result<()>;

    /// Schema of the tuples this operator produces.
    fn tuple_desc(&self) -> Arc<TupleDesc>;
}
