use thiserror::Error;

/// Errors surfaced by query execution. Storage failures, including
/// transaction aborts from lock exhaustion, pass through unchanged so the
/// caller can tell an abort apart from a protocol misuse.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Storage(#[from] strata::Error),

    #[error("next called past the end of an iterator")]
    NoSuchElement,

    #[error("operator misconstructed: {0}")]
    IllegalArgument(String),

    #[error("no table named '{0}' is registered")]
    TableNotFound(String),
}

impl ExecutionError {
    /// True when the underlying cause is a transaction abort; the caller
    /// should tear down its iterator tree and abort the transaction.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            ExecutionError::Storage(strata::Error::TransactionAborted(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
