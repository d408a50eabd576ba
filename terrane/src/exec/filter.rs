use std::sync::Arc;

use strata::{Tuple, TupleDesc};

use crate::errors::{ExecutionError, Result};
use crate::exec::Operator;
use crate::predicate::Predicate;

/// Passes through the child's tuples that satisfy a predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn Operator>,
    pending: Option<Tuple>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn Operator>) -> Filter {
        Filter {
            predicate,
            child,
            pending: None,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl Operator for Filter {
    fn open(&mut self) -> Result<()> {
        self.pending = None;
        self.child.open()
    }

    fn close(&mut self) {
        self.child.close();
        self.pending = None;
    }

    fn has_next(&mut self) -> Result<bool> {
        while self.pending.is_none() {
            if !self.child.has_next()? {
                return Ok(false);
            }
            let tuple = self.child.next()?;
            if self.predicate.filter(&tuple) {
                self.pending = Some(tuple);
            }
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement);
        }
        Ok(self.pending.take().expect("has_next buffered a tuple"))
    }

    fn rewind(&mut self) -> Result<()> {
        self.pending = None;
        self.child.rewind()
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.child.tuple_desc()
    }
}
