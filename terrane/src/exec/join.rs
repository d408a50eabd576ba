use std::sync::Arc;

use strata::{Tuple, TupleDesc};

use crate::errors::{ExecutionError, Result};
use crate::exec::Operator;
use crate::predicate::JoinPredicate;

/// Nested-loop join. For every left tuple the right child is rewound and
/// scanned in full; matches are emitted with the schemas concatenated,
/// left columns first.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    desc: Arc<TupleDesc>,
    current_left: Option<Tuple>,
    pending: Option<Tuple>,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn Operator>,
        right: Box<dyn Operator>,
    ) -> Join {
        let desc = Arc::new(TupleDesc::merge(&left.tuple_desc(), &right.tuple_desc()));
        Join {
            predicate,
            left,
            right,
            desc,
            current_left: None,
            pending: None,
        }
    }

    fn merged(&self, left: &Tuple, right: &Tuple) -> Tuple {
        let mut fields = Vec::with_capacity(self.desc.num_fields());
        fields.extend(left.fields().iter().cloned());
        fields.extend(right.fields().iter().cloned());
        Tuple::new(Arc::clone(&self.desc), fields)
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if self.current_left.is_none() {
                if !self.left.has_next()? {
                    return Ok(None);
                }
                self.current_left = Some(self.left.next()?);
                self.right.rewind()?;
            }
            let left = self
                .current_left
                .clone()
                .expect("a left tuple is in progress");
            while self.right.has_next()? {
                let right = self.right.next()?;
                if self.predicate.filter(&left, &right) {
                    return Ok(Some(self.merged(&left, &right)));
                }
            }
            self.current_left = None;
        }
    }
}

impl Operator for Join {
    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;
        self.current_left = None;
        self.pending = None;
        Ok(())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.current_left = None;
        self.pending = None;
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.pending.is_none() {
            self.pending = self.fetch_next()?;
        }
        Ok(self.pending.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement);
        }
        Ok(self.pending.take().expect("has_next buffered a tuple"))
    }

    fn rewind(&mut self) -> Result<()> {
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = None;
        self.pending = None;
        Ok(())
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }
}
