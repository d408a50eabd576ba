use crate::page::PageId;
use thiserror::Error;

/// Errors surfaced by the storage engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("page {0:?} has no free slot")]
    PageFull(PageId),

    #[error("tuple schema does not match the table schema")]
    SchemaMismatch,

    #[error("tuple slot is already empty")]
    SlotEmpty,

    #[error("tuple is not on this page")]
    TupleNotOnPage,

    #[error("tuple has no record id")]
    MissingRecordId,

    #[error("table {table_id} page {page_no} is past the end of the file")]
    InvalidPage { table_id: u32, page_no: u32 },

    #[error("file length {0} is not a whole number of pages")]
    PartialPage(u64),

    #[error("buffer pool cannot evict: every cached page is dirty")]
    NoCleanPage,

    #[error("no table with id {0} is registered")]
    UnknownTable(u32),

    #[error("transaction {0} aborted: lock acquisition exhausted its retries")]
    TransactionAborted(crate::transaction::TransactionId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;
