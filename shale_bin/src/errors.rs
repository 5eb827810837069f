use std::fmt;

use strata::lock_manager::LockError;
use strata::StorageError;

/// Errors raised by the query layer. Deadlocks are pulled out of the
/// storage error so callers can branch on the one condition that demands
/// an abort-and-retry.
#[derive(Debug)]
pub enum QueryError {
    Storage(StorageError),
    TableNotFound(String),
    InvalidSchema(String),
    /// An operator was driven outside its open/next/close protocol.
    OperatorState(&'static str),
    Deadlock,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Storage(err) => write!(f, "storage error: {}", err),
            QueryError::TableNotFound(name) => write!(f, "no table named '{}'", name),
            QueryError::InvalidSchema(msg) => write!(f, "invalid schema: {}", msg),
            QueryError::OperatorState(msg) => write!(f, "operator misuse: {}", msg),
            QueryError::Deadlock => write!(f, "deadlock detected; abort and retry"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for QueryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Deadlock => QueryError::Deadlock,
            other => QueryError::Storage(other),
        }
    }
}

impl From<LockError> for QueryError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Deadlock => QueryError::Deadlock,
        }
    }
}
