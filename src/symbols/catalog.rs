use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::symbols::shared::SharedSymbolTable;

/// Resolves the shared symbol tables named by import declarations.
pub trait Catalog: Send + Sync {
    /// Returns the table with `name` and `version` if present, otherwise the best available match
    /// for `name` (typically its greatest version), otherwise `None`.
    fn resolve(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>>;
}

/// An in-memory catalog keyed by table name and version.
#[derive(Debug, Default)]
pub struct SimpleCatalog {
    tables: RwLock<HashMap<String, BTreeMap<u32, Arc<SharedSymbolTable>>>>,
}

impl SimpleCatalog {
    pub fn new() -> SimpleCatalog {
        SimpleCatalog::default()
    }

    /// Adds `table`, replacing any table with the same name and version.
    pub fn put_table(&self, table: SharedSymbolTable) {
        let table = table.into_shared();
        self.tables
            .write()
            .entry(table.name().to_string())
            .or_default()
            .insert(table.version(), table);
    }

    pub fn remove_table(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        let mut tables = self.tables.write();
        let versions = tables.get_mut(name)?;
        let removed = versions.remove(&version);
        if versions.is_empty() {
            tables.remove(name);
        }
        removed
    }

    /// The greatest version of the table called `name`.
    pub fn get_table(&self, name: &str) -> Option<Arc<SharedSymbolTable>> {
        self.tables
            .read()
            .get(name)
            .and_then(|versions| versions.values().next_back())
            .cloned()
    }
}

impl Catalog for SimpleCatalog {
    fn resolve(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        let tables = self.tables.read();
        let versions = tables.get(name)?;
        versions
            .get(&version)
            .or_else(|| versions.values().next_back())
            .cloned()
    }
}
