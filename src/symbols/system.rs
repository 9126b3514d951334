use phf::phf_map;

/// Name of the system symbol table.
pub const ION: &str = "$ion";
/// Version of the only system symbol table defined so far.
pub const ION_1_0_VERSION: u32 = 1;

pub const ION_SID: usize = 1;
pub const ION_1_0_SID: usize = 2;
pub const ION_SYMBOL_TABLE_SID: usize = 3;
pub const NAME_SID: usize = 4;
pub const VERSION_SID: usize = 5;
pub const IMPORTS_SID: usize = 6;
pub const SYMBOLS_SID: usize = 7;
pub const MAX_ID_SID: usize = 8;
pub const ION_SHARED_SYMBOL_TABLE_SID: usize = 9;

pub const ION_1_0: &str = "$ion_1_0";
pub const ION_SYMBOL_TABLE: &str = "$ion_symbol_table";
pub const ION_SHARED_SYMBOL_TABLE: &str = "$ion_shared_symbol_table";

/// The max id of the system symbol table.
pub const SYSTEM_MAX_ID: usize = 9;

/// Text of the system symbols, where the symbol with SID `n` is at index `n - 1`.
pub(crate) static SYSTEM_SYMBOLS: [&str; SYSTEM_MAX_ID] = [
    ION,
    ION_1_0,
    ION_SYMBOL_TABLE,
    "name",
    "version",
    "imports",
    "symbols",
    "max_id",
    ION_SHARED_SYMBOL_TABLE,
];

static SYSTEM_SIDS: phf::Map<&'static str, usize> = phf_map! {
    "$ion" => 1,
    "$ion_1_0" => 2,
    "$ion_symbol_table" => 3,
    "name" => 4,
    "version" => 5,
    "imports" => 6,
    "symbols" => 7,
    "max_id" => 8,
    "$ion_shared_symbol_table" => 9,
};

/// # System Symbol Tables
///
/// Every Ion 1.0 stream implicitly starts with the `$ion` system symbol table, version 1:
///
/// ```text
/// $ion_shared_symbol_table::
/// {
///   name: "$ion",
///   version: 1,
///   symbols: [ "$ion", "$ion_1_0", "$ion_symbol_table", "name", "version",
///              "imports", "symbols", "max_id", "$ion_shared_symbol_table" ]
/// }
/// ```
///
/// The table is a process-wide constant; it has no state, so every handle to it is the same table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemSymbolTable;

impl SystemSymbolTable {
    pub fn name(&self) -> &'static str {
        ION
    }

    pub fn version(&self) -> u32 {
        ION_1_0_VERSION
    }

    pub fn max_id(&self) -> usize {
        SYSTEM_MAX_ID
    }

    pub fn ion_version_id(&self) -> &'static str {
        ION_1_0
    }

    pub fn find_known_symbol(&self, sid: usize) -> Option<&'static str> {
        match sid {
            0 => None,
            sid => SYSTEM_SYMBOLS.get(sid - 1).copied(),
        }
    }

    pub fn find_symbol(&self, text: &str) -> Option<usize> {
        SYSTEM_SIDS.get(text).copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &'static str> {
        SYSTEM_SYMBOLS.iter().copied()
    }
}
