use std::fmt;
use std::io;

use crate::lock_manager::LockError;

/// Errors surfaced by the storage core. Nothing here is recovered
/// internally; every variant propagates to the caller.
#[derive(Debug)]
pub enum StorageError {
    /// Page number outside the file's current page count.
    PageOutOfBounds { page_no: u32, num_pages: u32 },
    /// Operation targets a page id belonging to another table.
    WrongTable,
    /// Tuple descriptor differs from the page's or table's descriptor.
    SchemaMismatch,
    /// Insert on a page with no empty slot.
    PageFull,
    /// Delete of a tuple whose record id names a different page.
    NotOnThisPage,
    /// Delete of a slot that is already empty.
    SlotAlreadyEmpty,
    /// Read of a slot that holds no tuple.
    SlotEmpty,
    /// Eviction required but every resident page is dirty.
    NoCleanVictim,
    /// A wait-for cycle was detected at lock acquisition. The caller is
    /// expected to abort the transaction.
    Deadlock,
    /// No table registered under this id.
    TableMissing(u32),
    Io(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::PageOutOfBounds { page_no, num_pages } => {
                write!(f, "page {} out of bounds (file has {} pages)", page_no, num_pages)
            }
            StorageError::WrongTable => write!(f, "page belongs to another table"),
            StorageError::SchemaMismatch => write!(f, "tuple descriptor does not match the table"),
            StorageError::PageFull => write!(f, "no empty slot on page"),
            StorageError::NotOnThisPage => write!(f, "tuple is not stored on this page"),
            StorageError::SlotAlreadyEmpty => write!(f, "slot is already empty"),
            StorageError::SlotEmpty => write!(f, "slot holds no tuple"),
            StorageError::NoCleanVictim => write!(f, "every resident page is dirty"),
            StorageError::Deadlock => write!(f, "deadlock detected"),
            StorageError::TableMissing(id) => write!(f, "no table registered under id {}", id),
            StorageError::Io(err) => write!(f, "i/o failure: {}", err),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<LockError> for StorageError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Deadlock => StorageError::Deadlock,
        }
    }
}
