use std::sync::Arc;

use crate::symbols::shared::SharedSymbolTable;
use crate::symbols::system::SystemSymbolTable;

#[derive(Clone, Debug, PartialEq)]
enum Import {
    System(SystemSymbolTable),
    Shared(Arc<SharedSymbolTable>),
}

impl Import {
    fn max_id(&self) -> usize {
        match self {
            Import::System(table) => table.max_id(),
            Import::Shared(table) => table.max_id(),
        }
    }

    fn find_known_symbol(&self, sid: usize) -> Option<&str> {
        match self {
            Import::System(table) => table.find_known_symbol(sid),
            Import::Shared(table) => table.find_known_symbol(sid),
        }
    }

    fn find_symbol(&self, text: &str) -> Option<usize> {
        match self {
            Import::System(table) => table.find_symbol(text),
            Import::Shared(table) => table.find_symbol(text),
        }
    }
}

/// # Imports
///
/// Each import (including the implicit system table import) allocates a contiguous,
/// non-overlapping sequence of symbol IDs. The system symbols start at 1, each import starts one
/// past the end of the previous import, and the local symbols start immediately after the last
/// import. The size of each import's subsequence is defined by the max_id on the import
/// statement, regardless of the actual size of the referenced table.
///
/// The list is built once and then shared, immutably, by every local symbol table (and copy of a
/// local symbol table) that imports it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolTableImports {
    imports: Vec<Import>,
    // the SID immediately before the first SID of each import; strictly increasing
    bases: Vec<usize>,
    max_id: usize,
}

impl SymbolTableImports {
    /// An import list with no tables at all, not even the system table.
    pub fn new() -> SymbolTableImports {
        SymbolTableImports::default()
    }

    /// An import list that starts with the system symbol table.
    pub fn with_system_table() -> SymbolTableImports {
        let mut imports = SymbolTableImports::new();
        imports.push(Import::System(SystemSymbolTable), SystemSymbolTable.max_id());
        imports
    }

    /// Appends `table`, allocating `max_id` SIDs to it, or all of its SIDs when `max_id` is `None`.
    pub fn add_import(&mut self, table: Arc<SharedSymbolTable>, max_id: Option<usize>) {
        let max_id = max_id.unwrap_or_else(|| table.max_id());
        self.push(Import::Shared(table), max_id);
    }

    fn push(&mut self, import: Import, max_id: usize) {
        self.bases.push(self.max_id);
        self.imports.push(import);
        self.max_id += max_id;
    }

    /// The largest SID allocated to any import.
    pub fn max_id(&self) -> usize {
        self.max_id
    }

    /// The number of SIDs allocated to the import at `index`.
    fn span(&self, index: usize) -> usize {
        let next_base = self.bases.get(index + 1).copied().unwrap_or(self.max_id);
        next_base - self.bases[index]
    }

    /// Finds the import holding `sid`: the one with the greatest base strictly below `sid`.
    pub fn find_known_symbol(&self, sid: usize) -> Option<&str> {
        if sid == 0 || sid > self.max_id {
            return None;
        }
        let index = self.bases.partition_point(|base| *base < sid) - 1;
        self.imports[index].find_known_symbol(sid - self.bases[index])
    }

    /// Scans the imports in order. A match only counts if it lies within the span the import
    /// declared; the first match that does wins.
    pub fn find_symbol(&self, text: &str) -> Option<usize> {
        self.imports
            .iter()
            .enumerate()
            .find_map(|(index, import)| match import.find_symbol(text) {
                Some(local_sid) if local_sid > 0 && local_sid <= self.span(index) => {
                    Some(self.bases[index] + local_sid)
                }
                _ => None,
            })
    }

    pub fn has_system_table(&self) -> bool {
        matches!(self.imports.first(), Some(Import::System(_)))
    }

    pub fn system_symbol_table(&self) -> Option<SystemSymbolTable> {
        match self.imports.first() {
            Some(Import::System(table)) => Some(*table),
            _ => None,
        }
    }

    /// The imported shared tables, excluding the system table.
    pub fn imported_tables(&self) -> Vec<Arc<SharedSymbolTable>> {
        self.imports
            .iter()
            .filter_map(|import| match import {
                Import::Shared(table) => Some(Arc::clone(table)),
                Import::System(_) => None,
            })
            .collect()
    }

    /// The text of every imported SID in order, starting at SID 1. Each import contributes exactly
    /// as many entries as it was allocated.
    pub fn symbols(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.imports
            .iter()
            .enumerate()
            .flat_map(move |(index, import)| {
                (1..=self.span(index)).map(move |sid| {
                    if sid <= import.max_id() {
                        import.find_known_symbol(sid)
                    } else {
                        None
                    }
                })
            })
    }
}
