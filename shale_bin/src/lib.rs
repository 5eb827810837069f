//! # Shale
//! The query layer of the Shale database: a text schema loader, pull-based
//! query operators (scan, filter, join, aggregate, insert, delete), and
//! per-table statistics, all running against the `strata` storage engine.

use std::sync::Arc;

use errors::QueryError;
use executor::{OpIterator, SeqScan};
use strata::{BufferPool, Catalog, TransactionId};

pub mod aggregate_executor;
pub mod errors;
pub mod executor;
pub mod loader;
pub mod predicate;
pub mod stats;

pub fn debug_logs_enabled() -> bool {
    std::env::var_os("SHALE_DEBUG_LOG").is_some()
}

#[macro_export]
macro_rules! shale_debug_log {
    ($($arg:tt)*) => {
        if $crate::debug_logs_enabled() {
            println!($($arg)*);
        }
    };
}

/// Loads a schema file, then scans and prints every table it declares
/// under one committed transaction. On a deadlock the transaction aborts
/// before the error is surfaced.
pub fn run_dump(
    catalog: &Arc<Catalog>,
    pool: &Arc<BufferPool>,
    schema_path: &str,
) -> Result<(), QueryError> {
    let tables = loader::load_schema(schema_path, catalog)?;

    let tid = TransactionId::new();
    let result = dump_tables(catalog, pool, tid, &tables);
    match result {
        Ok(()) => {
            pool.transaction_complete(tid, true)?;
            Ok(())
        }
        Err(err) => {
            pool.transaction_complete(tid, false)?;
            Err(err)
        }
    }
}

fn dump_tables(
    catalog: &Arc<Catalog>,
    pool: &Arc<BufferPool>,
    tid: TransactionId,
    tables: &[String],
) -> Result<(), QueryError> {
    for name in tables {
        let table_id = catalog
            .table_id(name)
            .ok_or_else(|| QueryError::TableNotFound(name.clone()))?;
        let desc = catalog.tuple_desc(table_id)?;
        println!("{} ({})", name, desc);

        let mut scan = SeqScan::new(catalog, pool, tid, table_id, name)?;
        scan.open()?;
        let mut rows = 0;
        while let Some(tuple) = scan.next()? {
            println!("  {}", tuple);
            rows += 1;
        }
        scan.close();
        println!("  -- {} row(s)", rows);
    }
    Ok(())
}
