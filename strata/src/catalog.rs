//! The table registry. Tables are addressed by the stable id their heap
//! file derives from its path; the catalog itself holds no references back
//! into the storage machinery.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::StorageError;
use crate::heap_file::HeapFile;
use crate::tuple::TupleDesc;

#[derive(Debug, Clone)]
struct TableEntry {
    name: String,
    primary_key: String,
    file: Arc<HeapFile>,
}

#[derive(Debug, Default)]
struct CatalogState {
    by_id: HashMap<u32, TableEntry>,
    by_name: HashMap<String, u32>,
}

/// Registry of every table the engine knows about.
#[derive(Debug, Default)]
pub struct Catalog {
    state: RwLock<CatalogState>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table. On a name conflict the last table added wins
    /// the name.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, primary_key: &str) {
        let id = file.id();
        let mut state = self.state.write().unwrap();
        state.by_id.insert(
            id,
            TableEntry {
                name: name.to_string(),
                primary_key: primary_key.to_string(),
                file,
            },
        );
        state.by_name.insert(name.to_string(), id);
        crate::strata_debug_log!("[Catalog] registered table '{}' as id {}", name, id);
    }

    /// The id of the table with the given name.
    pub fn table_id(&self, name: &str) -> Option<u32> {
        self.state.read().unwrap().by_name.get(name).copied()
    }

    pub fn table_name(&self, id: u32) -> Result<String, StorageError> {
        self.entry(id).map(|entry| entry.name)
    }

    pub fn primary_key(&self, id: u32) -> Result<String, StorageError> {
        self.entry(id).map(|entry| entry.primary_key)
    }

    /// The heap file holding the table's data.
    pub fn file(&self, id: u32) -> Result<Arc<HeapFile>, StorageError> {
        self.entry(id).map(|entry| entry.file)
    }

    pub fn tuple_desc(&self, id: u32) -> Result<TupleDesc, StorageError> {
        self.entry(id).map(|entry| entry.file.tuple_desc().clone())
    }

    /// Ids of every registered table, in no particular order.
    pub fn table_ids(&self) -> Vec<u32> {
        self.state.read().unwrap().by_id.keys().copied().collect()
    }

    /// Drops every table from the registry.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap();
        state.by_id.clear();
        state.by_name.clear();
    }

    fn entry(&self, id: u32) -> Result<TableEntry, StorageError> {
        self.state
            .read()
            .unwrap()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(StorageError::TableMissing(id))
    }
}
