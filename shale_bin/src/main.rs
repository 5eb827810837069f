//! The entry point for the shale table-dump utility: loads a schema file
//! and prints the contents of every table it declares.

use std::process::ExitCode;
use std::sync::Arc;

use strata::{BufferPool, Catalog, LockManager};

fn main() -> ExitCode {
    let schema_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SHALE_SCHEMA").ok());
    let Some(schema_path) = schema_path else {
        eprintln!("usage: shale <schema-file>");
        return ExitCode::FAILURE;
    };

    let catalog = Arc::new(Catalog::new());
    let lock_manager = Arc::new(LockManager::new());
    let pool = Arc::new(BufferPool::new(
        strata::buffer_pool::DEFAULT_PAGES,
        Arc::clone(&catalog),
        lock_manager,
    ));

    match shale_bin::run_dump(&catalog, &pool, &schema_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("shale: {}", err);
            ExitCode::FAILURE
        }
    }
}
