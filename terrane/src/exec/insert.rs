use std::sync::Arc;

use strata::buffer_pool::BufferPool;
use strata::{Database, Field, FieldType, TransactionId, Tuple, TupleDesc};

use crate::errors::{ExecutionError, Result};
use crate::exec::Operator;

/// Drains its child into the table through the buffer pool, then emits a
/// single one-field tuple holding the number of tuples inserted. A second
/// pull yields nothing.
pub struct Insert {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn Operator>,
    table_id: u32,
    desc: Arc<TupleDesc>,
    done: bool,
}

impl Insert {
    pub fn new(
        db: &Database,
        tid: TransactionId,
        child: Box<dyn Operator>,
        table_id: u32,
    ) -> Result<Insert> {
        let table_desc = db.catalog().tuple_desc(table_id)?;
        if *child.tuple_desc() != *table_desc {
            return Err(ExecutionError::IllegalArgument(
                "child schema does not match the target table".to_string(),
            ));
        }
        Ok(Insert {
            pool: Arc::clone(db.buffer_pool()),
            tid,
            child,
            table_id,
            desc: Arc::new(TupleDesc::new(
                vec![FieldType::Int],
                vec![Some("count".to_string())],
            )),
            done: false,
        })
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if self.done {
            return Ok(None);
        }
        let mut count = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            self.pool.insert_tuple(self.tid, self.table_id, tuple)?;
            count += 1;
        }
        self.done = true;
        Ok(Some(Tuple::new(
            Arc::clone(&self.desc),
            vec![Field::Int(count)],
        )))
    }
}

impl Operator for Insert {
    fn open(&mut self) -> Result<()> {
        self.done = false;
        self.child.open()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(!self.done)
    }

    fn next(&mut self) -> Result<Tuple> {
        match self.fetch_next()? {
            Some(tuple) => Ok(tuple),
            None => Err(ExecutionError::NoSuchElement),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }
}
