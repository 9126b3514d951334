//! Local symbol table directives.
//!
//! ```text
//! $ion_symbol_table::
//! {
//!   imports: [ { name: "com.example.shared", version: 2, max_id: 100 }, ... ],
//!   symbols: [ "s1", "s2", null, ... ],
//! }
//! ```
//!
//! `imports` may instead be the symbol `$ion_symbol_table`, in which case the declared symbols are
//! appended to the active local symbol table. Fields other than `imports` and `symbols` are open
//! content, and null fields are ignored.

use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::binary::{scalar, IonType};
use crate::error::{IonResult, ProtocolError, SymbolError};
use crate::reader::IonReader;
use crate::symbols::system::{
    ION, IMPORTS_SID, ION_SYMBOL_TABLE_SID, MAX_ID_SID, NAME_SID, SYMBOLS_SID, SYSTEM_MAX_ID,
    VERSION_SID,
};
use crate::symbols::{
    LocalSymbolTable, SharedSymbolTable, SymbolTable, SymbolTableImports, SystemSymbolTable,
};

enum Imports {
    /// `imports: $ion_symbol_table`
    Append,
    /// Shared tables to import after the system table, in declaration order.
    Declared(Vec<Arc<SharedSymbolTable>>),
}

impl IonReader {
    /// Reads the directive the reader is positioned on and builds the table it declares.
    ///
    /// An append directive updates the active local table in place; nothing else is changed
    /// unless the whole directive was read successfully.
    pub(super) fn read_symbol_table_directive(&mut self) -> IonResult<SymbolTable> {
        self.cursor.step_in()?;
        let mut imports = None;
        let mut symbols = None;
        while let Some(ion_type) = self.next_child()? {
            if self.cursor.is_null() {
                continue;
            }
            match self.system_field_id()? {
                Some(IMPORTS_SID) => {
                    if imports.is_some() {
                        return Err(ProtocolError::DuplicateImports.into());
                    }
                    imports = Some(self.read_imports(ion_type)?);
                }
                Some(SYMBOLS_SID) => {
                    if symbols.is_some() {
                        return Err(ProtocolError::DuplicateSymbols.into());
                    }
                    // anything but a list declares no symbols
                    symbols = Some(if ion_type == IonType::List {
                        self.read_symbols()?
                    } else {
                        Vec::new()
                    });
                }
                _ => {}
            }
        }
        self.cursor.step_out()?;
        self.current = None;

        let symbols = symbols.unwrap_or_default();
        match imports.unwrap_or(Imports::Declared(Vec::new())) {
            Imports::Append => match self.local_table() {
                Some(table) => {
                    table.append(symbols)?;
                    Ok(SymbolTable::Local(Arc::clone(table)))
                }
                None => {
                    debug!("append directive over the system symbol table");
                    Ok(SymbolTable::Local(Arc::new(
                        LocalSymbolTable::with_system_table(symbols),
                    )))
                }
            },
            Imports::Declared(tables) => {
                if !tables.is_empty() {
                    debug!(
                        "importing {}",
                        tables
                            .iter()
                            .map(|table| format!("{} version {}", table.name(), table.version()))
                            .join(", ")
                    );
                }
                let mut imports = SymbolTableImports::with_system_table();
                for table in tables {
                    imports.add_import(table, None);
                }
                Ok(SymbolTable::Local(Arc::new(LocalSymbolTable::new(
                    Arc::new(imports),
                    symbols,
                ))))
            }
        }
    }

    /// The system SID naming the current field: its own SID if it is a system symbol, otherwise
    /// the system SID of its text.
    fn system_field_id(&self) -> IonResult<Option<usize>> {
        let sid = match self.cursor.field_sid() {
            Some(sid) => sid,
            None => return Ok(None),
        };
        if sid <= SYSTEM_MAX_ID {
            return Ok(Some(sid));
        }
        Ok(self
            .symbol_table
            .resolve(sid)?
            .and_then(|text| SystemSymbolTable.find_symbol(&text)))
    }

    fn read_imports(&mut self, ion_type: IonType) -> IonResult<Imports> {
        match ion_type {
            IonType::List => {
                let mut tables = Vec::new();
                self.cursor.step_in()?;
                while let Some(ion_type) = self.next_child()? {
                    if ion_type == IonType::Struct && !self.cursor.is_null() {
                        if let Some(table) = self.read_import()? {
                            tables.push(table);
                        }
                    }
                }
                self.cursor.step_out()?;
                Ok(Imports::Declared(tables))
            }
            IonType::Symbol if self.is_append_marker()? => Ok(Imports::Append),
            _ => Ok(Imports::Declared(Vec::new())),
        }
    }

    fn is_append_marker(&mut self) -> IonResult<bool> {
        let (_, bytes) = self.representation(&[IonType::Symbol], "symbol")?;
        let sid = scalar::decode_symbol_id(bytes)?;
        if sid == ION_SYMBOL_TABLE_SID {
            return Ok(true);
        }
        Ok(self.symbol_table.resolve(sid)?.as_deref()
            == SystemSymbolTable.find_known_symbol(ION_SYMBOL_TABLE_SID))
    }

    fn read_symbols(&mut self) -> IonResult<Vec<Option<String>>> {
        let mut symbols = Vec::new();
        self.cursor.step_in()?;
        while let Some(ion_type) = self.next_child()? {
            if ion_type == IonType::String && !self.cursor.is_null() {
                symbols.push(Some(self.string_value()?));
            } else {
                symbols.push(None);
            }
        }
        self.cursor.step_out()?;
        Ok(symbols)
    }

    /// Reads one `{name, version, max_id}` import declaration, resolving it through the catalog.
    ///
    /// Returns `None` for declarations that are to be ignored: those without a name and those
    /// naming the system table.
    fn read_import(&mut self) -> IonResult<Option<Arc<SharedSymbolTable>>> {
        let mut name = None;
        let mut version = None;
        let mut max_id = None;
        self.cursor.step_in()?;
        while let Some(ion_type) = self.next_child()? {
            if self.cursor.is_null() {
                continue;
            }
            match (self.system_field_id()?, ion_type) {
                (Some(NAME_SID), IonType::String) => name = Some(self.string_value()?),
                (Some(VERSION_SID), IonType::Int) => version = Some(self.big_int_value()?),
                (Some(MAX_ID_SID), IonType::Int) => max_id = Some(self.big_int_value()?),
                _ => {}
            }
        }
        self.cursor.step_out()?;

        let name = match name {
            Some(name) if !name.is_empty() && name != ION => name,
            _ => return Ok(None),
        };
        let version = version
            .as_ref()
            .and_then(BigInt::to_u32)
            .filter(|version| *version >= 1)
            .unwrap_or(1);
        let table = self
            .catalog
            .as_ref()
            .and_then(|catalog| catalog.resolve(&name, version));
        let max_id = match max_id.as_ref().and_then(BigInt::to_usize) {
            Some(max_id) => max_id,
            None => match &table {
                Some(table) if table.version() == version => table.max_id(),
                _ => return Err(SymbolError::MissingMaxId { name, version }.into()),
            },
        };

        let table = match table {
            Some(table) if table.version() == version && table.max_id() == max_id => table,
            Some(table) => {
                debug!(
                    "importing {} version {} with max id {} as a substitute for version {}",
                    name,
                    version,
                    max_id,
                    table.version()
                );
                Arc::new(SharedSymbolTable::substitute(
                    name,
                    version,
                    max_id,
                    Some(&table),
                ))
            }
            None => {
                debug!(
                    "{} version {} is not in the catalog; importing {} unknown symbols",
                    name, version, max_id
                );
                Arc::new(SharedSymbolTable::substitute(name, version, max_id, None))
            }
        };
        Ok(Some(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IonError;
    use crate::reader::ReaderBuilder;
    use crate::symbols::SimpleCatalog;
    use hex::decode;
    use pretty_assertions::assert_eq;

    fn from_hex(hex: &str) -> IonReader {
        ReaderBuilder::new().build_from_bytes(decode(hex).unwrap())
    }

    #[test]
    fn declares_local_symbols() {
        // $ion_symbol_table::{symbols: ["a", null, 5]} followed by 'a' and $11
        let mut reader = from_hex("e00100eaea8183d787b581610f2105710a710b");
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.string_value().unwrap(), "a");
        let table = reader.current_symbol_table();
        assert_eq!(table.max_id(), 12);
        assert_eq!(table.find_symbol("a"), Some(10));
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.symbol_value().unwrap().text, None);
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        // $ion_symbol_table::{symbols: [], symbols: []}
        let mut reader = from_hex("e00100eae78183d487b087b0");
        assert!(matches!(
            reader.next(),
            Err(IonError::Protocol(ProtocolError::DuplicateSymbols))
        ));
        // $ion_symbol_table::{imports: [], imports: []}
        let mut reader = from_hex("e00100eae78183d486b086b0");
        assert!(matches!(
            reader.next(),
            Err(IonError::Protocol(ProtocolError::DuplicateImports))
        ));
        // a null field does not count
        let mut reader = from_hex("e00100eae78183d487bf87b0");
        assert_eq!(reader.next().unwrap(), None);
        assert!(reader.current_symbol_table().is_local());
    }

    #[test]
    fn imports_resolve_through_the_catalog() {
        let catalog = SimpleCatalog::new();
        catalog.put_table(SharedSymbolTable::new(
            "s",
            1,
            vec![Some("x".to_string()), Some("y".to_string())],
        ));
        // $ion_symbol_table::{imports: [{name: "s", version: 1, max_id: 2},
        //                               {name: "t", max_id: 1}]}
        let mut bytes = decode("e00100eaee988183de9486be91").unwrap();
        bytes.extend(decode("d9848173852101882102").unwrap());
        bytes.extend(decode("d6848174882101").unwrap());
        // x, y, then t's only symbol
        bytes.extend(decode("710a710b710c").unwrap());

        let mut reader = ReaderBuilder::new()
            .with_catalog(Arc::new(catalog))
            .build_from_bytes(bytes);
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.string_value().unwrap(), "x");
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.string_value().unwrap(), "y");
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.symbol_value().unwrap().text, None);

        let table = reader.current_symbol_table();
        let imported = table.as_local().unwrap().imported_tables();
        assert_eq!(imported.len(), 2);
        assert!(!imported[0].is_substitute());
        assert!(imported[1].is_substitute());
        assert_eq!(table.max_id(), 12);
    }

    #[test]
    fn import_without_max_id_needs_an_exact_match() {
        // $ion_symbol_table::{imports: [{name: "t"}]}
        let mut reader = from_hex("e00100eae98183d686b4d3848174");
        assert!(matches!(
            reader.next(),
            Err(IonError::Symbol(SymbolError::MissingMaxId { .. }))
        ));
    }
}
