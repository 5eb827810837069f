//! Shared harness for the integration tests: a scratch database with its
//! own directory, catalog, lock manager, and buffer pool.
#![allow(dead_code)]

use std::sync::Arc;

use strata::{BufferPool, Catalog, Field, FieldType, HeapFile, LockManager, Tuple, TupleDesc};
use tempfile::TempDir;

pub struct TestDb {
    pub dir: TempDir,
    pub catalog: Arc<Catalog>,
    pub pool: Arc<BufferPool>,
}

/// A fresh database whose buffer pool caches at most `max_pages` pages.
pub fn setup(max_pages: usize) -> TestDb {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new());
    let lock_manager = Arc::new(LockManager::new());
    let pool = Arc::new(BufferPool::new(
        max_pages,
        Arc::clone(&catalog),
        lock_manager,
    ));
    TestDb { dir, catalog, pool }
}

impl TestDb {
    /// Creates `<name>.dat` in the scratch directory and registers it.
    /// Returns the table id.
    pub fn create_table(&self, name: &str, desc: TupleDesc) -> u32 {
        let path = self.dir.path().join(format!("{}.dat", name));
        let file = Arc::new(HeapFile::open(path, desc).unwrap());
        let id = file.id();
        self.catalog.add_table(file, name, "");
        id
    }
}

/// The `(int a, string b)` schema the scenarios run on.
pub fn int_string_desc() -> TupleDesc {
    TupleDesc::new(vec![
        (FieldType::Int, Some("a".to_string())),
        (FieldType::Str, Some("b".to_string())),
    ])
}

pub fn row(a: i32, b: &str) -> Tuple {
    Tuple::new(
        int_string_desc(),
        vec![Field::Int(a), Field::Str(b.to_string())],
    )
}

/// Extracts `(a, b)` from a scanned tuple.
pub fn fields_of(tuple: &Tuple) -> (i32, String) {
    match tuple.fields() {
        [Field::Int(a), Field::Str(b)] => (*a, b.clone()),
        other => panic!("unexpected tuple shape {:?}", other),
    }
}
