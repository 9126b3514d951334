//! Symbol tables and the resolution of symbol IDs to text.
//!
//! Ion symbols may have text that is unknown. That is, there is no binding to a (potentially
//! empty) sequence of text. This can happen as a result of not having access to a shared symbol
//! table being imported, or having a symbol table (shared or local) that contains a null slot.

pub(crate) mod address_map;
pub mod catalog;
pub mod imports;
pub mod local;
pub mod shared;
pub mod system;

use std::sync::Arc;

use crate::error::SymbolError;

pub use self::catalog::{Catalog, SimpleCatalog};
pub use self::imports::SymbolTableImports;
pub use self::local::LocalSymbolTable;
pub use self::shared::SharedSymbolTable;
pub use self::system::SystemSymbolTable;

/// ## SymbolToken
///
/// A symbol as read from a stream: its text if known, and its symbol ID if it has one.
///
/// SymbolTokens with the same known text are equivalent regardless of SID. A token with neither
/// text nor SID is never produced by the reader; SID 0 ("symbol zero") is represented as
/// `sid: Some(0)` with no text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolToken {
    pub text: Option<String>,
    pub sid: Option<usize>,
}

impl SymbolToken {
    pub fn new(text: impl Into<String>, sid: usize) -> SymbolToken {
        SymbolToken {
            text: Some(text.into()),
            sid: Some(sid),
        }
    }

    pub fn unknown_text(sid: usize) -> SymbolToken {
        SymbolToken {
            text: None,
            sid: Some(sid),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// ## SymbolTable
///
/// A handle to one of the three kinds of symbol table. Handles are cheap to clone; a cloned
/// `Local` handle refers to the same (possibly still growing) table.
///
/// When mapping from symbol ID to string, there is no ambiguity. However, due to unavailable
/// imports, certain IDs may appear to be undefined when binary data is decoded. Any symbol ID
/// outside of the range of the symbol table it is encoded under is an error.
///
/// When mapping from string to symbol ID, there may be multiple assigned IDs; the lowest known
/// ID is selected, so symbols defined by the system symbol table can never be mapped to other IDs.
#[derive(Clone, Debug)]
pub enum SymbolTable {
    System,
    Shared(Arc<SharedSymbolTable>),
    Local(Arc<LocalSymbolTable>),
}

impl SymbolTable {
    pub fn find_known_symbol(&self, sid: usize) -> Option<String> {
        match self {
            SymbolTable::System => SystemSymbolTable.find_known_symbol(sid).map(String::from),
            SymbolTable::Shared(table) => table.find_known_symbol(sid).map(String::from),
            SymbolTable::Local(table) => table.find_known_symbol(sid),
        }
    }

    pub fn find_symbol(&self, text: &str) -> Option<usize> {
        match self {
            SymbolTable::System => SystemSymbolTable.find_symbol(text),
            SymbolTable::Shared(table) => table.find_symbol(text),
            SymbolTable::Local(table) => table.find_symbol(text),
        }
    }

    pub fn max_id(&self) -> usize {
        match self {
            SymbolTable::System => SystemSymbolTable.max_id(),
            SymbolTable::Shared(table) => table.max_id(),
            SymbolTable::Local(table) => table.max_id(),
        }
    }

    /// The text of `sid`, which is `None` for symbol zero and for gaps.
    pub fn resolve(&self, sid: usize) -> Result<Option<String>, SymbolError> {
        let max_id = self.max_id();
        if sid > max_id {
            return Err(SymbolError::AboveMaxId {
                max_id,
                symbol_id: sid,
            });
        }
        Ok(self.find_known_symbol(sid))
    }

    /// Resolves `sid` to a token, failing only when it is above the max id.
    pub fn token(&self, sid: usize) -> Result<SymbolToken, SymbolError> {
        Ok(SymbolToken {
            text: self.resolve(sid)?,
            sid: Some(sid),
        })
    }

    /// Interns `text` into a local table. Other tables only "intern" text they already hold.
    pub fn intern(&self, text: &str) -> Result<SymbolToken, SymbolError> {
        match self {
            SymbolTable::Local(table) => table.intern(text),
            _ => match self.find_symbol(text) {
                Some(sid) => Ok(SymbolToken::new(text, sid)),
                None => Err(SymbolError::ImmutableTable {
                    name: self.name().unwrap_or_default().to_string(),
                    text: text.to_string(),
                }),
            },
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            SymbolTable::System => Some(SystemSymbolTable.name()),
            SymbolTable::Shared(table) => Some(table.name()),
            SymbolTable::Local(_) => None,
        }
    }

    pub fn version(&self) -> Option<u32> {
        match self {
            SymbolTable::System => Some(SystemSymbolTable.version()),
            SymbolTable::Shared(table) => Some(table.version()),
            SymbolTable::Local(_) => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, SymbolTable::Local(_))
    }

    pub fn is_shared(&self) -> bool {
        !self.is_local()
    }

    pub fn is_system(&self) -> bool {
        matches!(self, SymbolTable::System)
    }

    pub fn is_substitute(&self) -> bool {
        matches!(self, SymbolTable::Shared(table) if table.is_substitute())
    }

    pub fn is_read_only(&self) -> bool {
        match self {
            SymbolTable::Local(table) => table.is_read_only(),
            _ => true,
        }
    }

    /// True if both handles refer to the same table instance.
    pub fn same_table(&self, other: &SymbolTable) -> bool {
        match (self, other) {
            (SymbolTable::System, SymbolTable::System) => true,
            (SymbolTable::Shared(a), SymbolTable::Shared(b)) => Arc::ptr_eq(a, b),
            (SymbolTable::Local(a), SymbolTable::Local(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_local(&self) -> Option<&Arc<LocalSymbolTable>> {
        match self {
            SymbolTable::Local(table) => Some(table),
            _ => None,
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn system_handle() {
        let table = SymbolTable::System;
        assert!(table.is_system() && table.is_shared() && !table.is_local());
        assert_eq!(table.resolve(0), Ok(None));
        assert_eq!(table.resolve(4), Ok(Some("name".to_string())));
        assert_eq!(
            table.resolve(10),
            Err(SymbolError::AboveMaxId {
                max_id: 9,
                symbol_id: 10
            })
        );
        assert_eq!(table.intern("imports"), Ok(SymbolToken::new("imports", 6)));
        assert_eq!(
            table.intern("fresh"),
            Err(SymbolError::ImmutableTable {
                name: "$ion".to_string(),
                text: "fresh".to_string()
            })
        );
    }

    #[test]
    fn local_handle() {
        let table = SymbolTable::Local(Arc::new(LocalSymbolTable::with_system_table(vec![
            Some("a".to_string()),
            None,
        ])));
        assert!(table.is_local() && !table.is_read_only());
        assert_eq!(table.max_id(), 11);
        assert_eq!(table.token(10), Ok(SymbolToken::new("a", 10)));
        assert_eq!(table.token(11), Ok(SymbolToken::unknown_text(11)));
        assert_eq!(table.intern("b").unwrap().sid, Some(12));
        assert!(table.same_table(&table.clone()));
        assert!(!table.same_table(&SymbolTable::System));
        assert_eq!(table.name(), None);
    }

    #[test]
    fn substitute_handle() {
        let table = SymbolTable::Shared(Arc::new(SharedSymbolTable::substitute("x", 1, 2, None)));
        assert!(table.is_substitute());
        assert_eq!(table.resolve(2), Ok(None));
        assert_eq!(table.version(), Some(1));
    }
}
