use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::error::{ProtocolError, SymbolError};
use crate::symbols::address_map::AddressMap;
use crate::symbols::imports::SymbolTableImports;
use crate::symbols::shared::SharedSymbolTable;
use crate::symbols::system::SystemSymbolTable;
use crate::symbols::SymbolToken;

/// # Local Symbol Tables
///
/// A local symbol table defines symbols through two mechanisms, both of which are optional.
///
/// First, it imports the symbols from one or more shared symbol tables, offsetting symbol IDs
/// appropriately so they do not overlap. Second, it defines local symbols, numbered immediately
/// after the last import.
///
/// The symbol map is seeded with the text of every imported SID when the table is built, so a
/// lookup never has to walk the import list. SID 0 is never mapped to text, and
/// `max_id() == imported_max_id() + <number of local symbols>`.
///
/// A table may be read and copied from several threads while its owner keeps interning into it;
/// every access to the symbol map takes the per-table lock.
#[derive(Debug)]
pub struct LocalSymbolTable {
    imports: Arc<SymbolTableImports>,
    state: Mutex<LocalState>,
}

#[derive(Debug)]
struct LocalState {
    symbols: AddressMap,
    read_only: bool,
}

impl LocalSymbolTable {
    pub fn new<I>(imports: Arc<SymbolTableImports>, symbols: I) -> LocalSymbolTable
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut map = AddressMap::new();
        // $0
        map.assign(None);
        for text in imports.symbols() {
            map.assign(text.map(String::from));
        }
        for text in symbols {
            map.assign(text);
        }
        LocalSymbolTable {
            imports,
            state: Mutex::new(LocalState {
                symbols: map,
                read_only: false,
            }),
        }
    }

    /// A table importing only the system symbol table.
    pub fn with_system_table<I>(symbols: I) -> LocalSymbolTable
    where
        I: IntoIterator<Item = Option<String>>,
    {
        LocalSymbolTable::new(Arc::new(SymbolTableImports::with_system_table()), symbols)
    }

    pub fn imports(&self) -> &Arc<SymbolTableImports> {
        &self.imports
    }

    pub fn imported_max_id(&self) -> usize {
        self.imports.max_id()
    }

    pub fn max_id(&self) -> usize {
        self.state.lock().symbols.len() - 1
    }

    pub fn is_read_only(&self) -> bool {
        self.state.lock().read_only
    }

    /// Freezes this instance. Copies made afterwards are mutable again.
    pub fn make_read_only(&self) {
        self.state.lock().read_only = true;
    }

    pub fn system_symbol_table(&self) -> Option<SystemSymbolTable> {
        self.imports.system_symbol_table()
    }

    pub fn imported_tables(&self) -> Vec<Arc<SharedSymbolTable>> {
        self.imports.imported_tables()
    }

    pub fn find_known_symbol(&self, sid: usize) -> Option<String> {
        self.state.lock().symbols.text(sid).map(String::from)
    }

    pub fn find_symbol(&self, text: &str) -> Option<usize> {
        self.state.lock().symbols.address(text)
    }

    pub fn find(&self, text: &str) -> Option<SymbolToken> {
        self.find_symbol(text)
            .map(|sid| SymbolToken::new(text.to_string(), sid))
    }

    /// Returns the lowest SID already mapped to `text`, or assigns it the next SID.
    pub fn intern(&self, text: &str) -> Result<SymbolToken, SymbolError> {
        let mut state = self.state.lock();
        if let Some(sid) = state.symbols.address(text) {
            return Ok(SymbolToken::new(text.to_string(), sid));
        }
        if state.read_only {
            return Err(SymbolError::ReadOnlyTable);
        }
        let sid = state.symbols.assign(Some(text.to_string()));
        Ok(SymbolToken::new(text.to_string(), sid))
    }

    /// Interns UTF-16 text, rejecting unpaired surrogates without touching the table.
    pub fn intern_utf16(&self, units: &[u16]) -> Result<SymbolToken, SymbolError> {
        validate_surrogates(units)?;
        let text = String::from_utf16(units).map_err(|_| SymbolError::InvalidText {
            position: 0,
            reason: "invalid UTF-16",
        })?;
        self.intern(&text)
    }

    /// Appends symbols declared by a later `imports: $ion_symbol_table` directive. Existing SIDs
    /// are unchanged.
    pub(crate) fn append<I>(&self, symbols: I) -> Result<(), ProtocolError>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut state = self.state.lock();
        if state.read_only {
            return Err(ProtocolError::AppendToNonLocalTable("read-only"));
        }
        let before = state.symbols.len();
        for text in symbols {
            state.symbols.assign(text);
        }
        debug!(
            "appended {} symbols to the local symbol table",
            state.symbols.len() - before
        );
        Ok(())
    }

    /// An independent, mutable snapshot of this table sharing the same imports.
    pub fn make_copy(&self) -> LocalSymbolTable {
        let state = self.state.lock();
        LocalSymbolTable {
            imports: Arc::clone(&self.imports),
            state: Mutex::new(LocalState {
                symbols: state.symbols.clone(),
                read_only: false,
            }),
        }
    }

    /// A copy of this table as it was when its max id was `max_id`. Imported SIDs are always kept.
    pub fn make_copy_at(&self, max_id: usize) -> LocalSymbolTable {
        let copy = self.make_copy();
        let max_id = max_id.max(self.imported_max_id());
        copy.state.lock().symbols.truncate(max_id + 1);
        copy
    }

    /// The text of the locally declared symbols, in SID order; `None` marks a gap.
    pub fn declared_symbols(&self) -> Vec<Option<String>> {
        self.state
            .lock()
            .symbols
            .iter_from(self.imported_max_id() + 1)
            .map(|text| text.map(String::from))
            .collect()
    }

    /// True if this table is `other` with zero or more symbols appended: both share the same
    /// imports instance, and `other`'s symbols are an ordered prefix of this table's.
    pub fn symtab_extends(&self, other: &LocalSymbolTable) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if !Arc::ptr_eq(&self.imports, &other.imports) {
            return false;
        }
        // lock in address order so two threads comparing the same pair cannot deadlock
        let (this, that) = if (self as *const LocalSymbolTable) < (other as *const LocalSymbolTable)
        {
            let this = self.state.lock();
            (this, other.state.lock())
        } else {
            let that = other.state.lock();
            (self.state.lock(), that)
        };
        this.symbols.len() >= that.symbols.len() && this.symbols.is_extension_of(&that.symbols)
    }
}

impl Clone for LocalSymbolTable {
    fn clone(&self) -> Self {
        let copy = self.make_copy();
        if self.is_read_only() {
            copy.make_read_only();
        }
        copy
    }
}

/// Checks that every surrogate code unit in `units` belongs to a well-formed pair.
pub(crate) fn validate_surrogates(units: &[u16]) -> Result<(), SymbolError> {
    let mut position = 0;
    while position < units.len() {
        match units[position] {
            0xDC00..=0xDFFF => {
                return Err(SymbolError::InvalidText {
                    position,
                    reason: "unpaired trailing surrogate",
                })
            }
            0xD800..=0xDBFF => {
                position += 1;
                match units.get(position).copied() {
                    Some(0xDC00..=0xDFFF) => {}
                    _ => {
                        return Err(SymbolError::InvalidText {
                            position,
                            reason: "unmatched leading surrogate",
                        })
                    }
                }
            }
            _ => {}
        }
        position += 1;
    }
    Ok(())
}
