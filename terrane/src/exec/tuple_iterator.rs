use std::sync::Arc;

use strata::{Tuple, TupleDesc};

use crate::errors::{ExecutionError, Result};
use crate::exec::Operator;

/// An operator over a materialized list of tuples. Feeds `Insert` with
/// literal rows and stands in for any child in tests.
pub struct TupleIterator {
    desc: Arc<TupleDesc>,
    tuples: Vec<Tuple>,
    pos: usize,
    opened: bool,
}

impl TupleIterator {
    pub fn new(desc: Arc<TupleDesc>, tuples: Vec<Tuple>) -> TupleIterator {
        assert!(
            tuples.iter().all(|t| **t.desc() == *desc),
            "every tuple must match the schema"
        );
        TupleIterator {
            desc,
            tuples,
            pos: 0,
            opened: false,
        }
    }
}

impl Operator for TupleIterator {
    fn open(&mut self) -> Result<()> {
        self.pos = 0;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.opened && self.pos < self.tuples.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement);
        }
        let tuple = self.tuples[self.pos].clone();
        self.pos += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }
}
