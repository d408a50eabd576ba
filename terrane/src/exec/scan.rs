use std::sync::Arc;

use strata::buffer_pool::BufferPool;
use strata::heap_file::{HeapFile, HeapFileIterator};
use strata::{Database, TransactionId, Tuple, TupleDesc};

use crate::errors::{ExecutionError, Result};
use crate::exec::Operator;

/// Sequential scan of one table on behalf of a transaction. Pages are
/// pulled through the buffer pool with shared locks; the scan itself never
/// releases them.
pub struct SeqScan {
    pool: Arc<BufferPool>,
    file: Arc<HeapFile>,
    tid: TransactionId,
    desc: Arc<TupleDesc>,
    iter: Option<HeapFileIterator>,
    pending: Option<Tuple>,
}

impl SeqScan {
    pub fn new(db: &Database, tid: TransactionId, table_id: u32, alias: &str) -> Result<SeqScan> {
        let file = db.catalog().database_file(table_id)?;
        let desc = Arc::new(alias_desc(file.desc(), alias));
        Ok(SeqScan {
            pool: Arc::clone(db.buffer_pool()),
            file,
            tid,
            desc,
            iter: None,
            pending: None,
        })
    }

    /// Convenience constructor resolving the table by name.
    pub fn by_name(db: &Database, tid: TransactionId, table: &str) -> Result<SeqScan> {
        let table_id = db
            .catalog()
            .table_id(table)
            .ok_or_else(|| ExecutionError::TableNotFound(table.to_string()))?;
        SeqScan::new(db, tid, table_id, table)
    }
}

/// The scan's output schema carries alias-qualified column names.
fn alias_desc(base: &TupleDesc, alias: &str) -> TupleDesc {
    let types = (0..base.num_fields()).map(|i| base.field_type(i)).collect();
    let names = (0..base.num_fields())
        .map(|i| base.field_name(i).map(|name| format!("{alias}.{name}")))
        .collect();
    TupleDesc::new(types, names)
}

impl Operator for SeqScan {
    fn open(&mut self) -> Result<()> {
        let mut iter = self.file.iter(Arc::clone(&self.pool), self.tid);
        iter.open().map_err(ExecutionError::Storage)?;
        self.iter = Some(iter);
        self.pending = None;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(iter) = &mut self.iter {
            iter.close();
        }
        self.iter = None;
        self.pending = None;
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }
        let Some(iter) = &mut self.iter else {
            return Ok(false);
        };
        self.pending = iter.next().map_err(ExecutionError::Storage)?;
        Ok(self.pending.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement);
        }
        Ok(self.pending.take().expect("has_next buffered a tuple"))
    }

    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }
}
