use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::db::Database;
use crate::error::Result;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(0);

/// A globally unique, monotonically increasing transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new() -> TransactionId {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        TransactionId::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transaction handle. The lifecycle is start, then exactly one of commit
/// or abort; both terminal states release every lock the transaction holds.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    started: bool,
}

impl Transaction {
    pub fn new() -> Transaction {
        Transaction {
            id: TransactionId::new(),
            started: false,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn start(&mut self) {
        self.started = true;
        crate::strata_debug_log!("[Transaction::start] tx {} started", self.id);
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn commit(&mut self, db: &Database) -> Result<()> {
        self.complete(db, true)
    }

    pub fn abort(&mut self, db: &Database) -> Result<()> {
        self.complete(db, false)
    }

    fn complete(&mut self, db: &Database, commit: bool) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        db.buffer_pool().transaction_complete(self.id, commit)?;
        {
            let mut log = db.log().lock().unwrap();
            if commit {
                log.log_commit(self.id)?;
            } else {
                log.log_abort(self.id)?;
            }
        }
        self.started = false;
        crate::strata_debug_log!(
            "[Transaction::complete] tx {} {}",
            self.id,
            if commit { "committed" } else { "aborted" }
        );
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Transaction::new()
    }
}
