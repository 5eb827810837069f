//! # Strata Storage Engine
//! The storage and transaction core of the Shale database.
//! This crate owns the on-disk page format, the heap files that hold table
//! data, the buffer pool every page access funnels through, and the
//! page-level lock manager that coordinates concurrent transactions.

/// The shared page cache and transaction finalization.
pub mod buffer_pool;
/// The table registry addressed by table id.
pub mod catalog;
/// The storage error taxonomy.
pub mod error;
/// On-disk heap files and page I/O.
pub mod heap_file;
/// Page-level shared/exclusive locks with deadlock detection.
pub mod lock_manager;
/// The slotted heap page layout.
pub mod page;
/// Transaction identifiers.
pub mod transaction;
/// Field values, tuple descriptors, and tuples.
pub mod tuple;

use std::sync::atomic::{AtomicUsize, Ordering};

/// The default size of a single page in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// The size of a single page in bytes.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::SeqCst)
}

/// Overrides the page size. Only tests should call this: data files written
/// under one page size are unreadable under another.
pub fn set_page_size(size: usize) {
    PAGE_SIZE.store(size, Ordering::SeqCst);
}

/// Restores the default page size.
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::SeqCst);
}

pub fn debug_logs_enabled() -> bool {
    std::env::var_os("STRATA_DEBUG_LOG").is_some()
}

#[macro_export]
macro_rules! strata_debug_log {
    ($($arg:tt)*) => {
        if $crate::debug_logs_enabled() {
            println!($($arg)*);
        }
    };
}

pub use buffer_pool::{BufferPool, Permission, SharedPage};
pub use catalog::Catalog;
pub use error::StorageError;
pub use heap_file::{HeapFile, HeapFileIterator};
pub use lock_manager::{LockManager, LockMode};
pub use page::{HeapPage, PageId};
pub use transaction::TransactionId;
pub use tuple::{Field, FieldType, RecordId, Tuple, TupleDesc};
