use std::collections::HashMap;
use std::sync::Arc;

/// ## SharedSymbolTable
///
/// A named, versioned, immutable symbol table supplied by a catalog and imported by local
/// symbol tables.
///
/// A *substitute* table stands in for a shared table that could not be found in the catalog with
/// the exact version and max id an import asked for. It reserves exactly the declared number of
/// symbol IDs; the IDs whose text could not be taken from the closest available table have unknown
/// text.
#[derive(Clone, Debug, PartialEq)]
pub struct SharedSymbolTable {
    name: String,
    version: u32,
    // the symbol with SID `n` is stored at index `n - 1`; `None` is a gap
    symbols: Vec<Option<String>>,
    // lowest SID for each text
    sids: HashMap<String, usize>,
    substitute: bool,
}

impl SharedSymbolTable {
    pub fn new<I>(name: impl Into<String>, version: u32, symbols: I) -> SharedSymbolTable
    where
        I: IntoIterator<Item = Option<String>>,
    {
        SharedSymbolTable::build(name.into(), version, symbols.into_iter().collect(), false)
    }

    /// Creates a substitute for `name`/`version` reserving `max_id` symbol IDs, taking the text of
    /// each ID that `original` defines.
    pub fn substitute(
        name: impl Into<String>,
        version: u32,
        max_id: usize,
        original: Option<&SharedSymbolTable>,
    ) -> SharedSymbolTable {
        let symbols = (1..=max_id)
            .map(|sid| original.and_then(|table| table.find_known_symbol(sid).map(String::from)))
            .collect();
        SharedSymbolTable::build(name.into(), version, symbols, true)
    }

    fn build(
        name: String,
        version: u32,
        symbols: Vec<Option<String>>,
        substitute: bool,
    ) -> SharedSymbolTable {
        let mut sids = HashMap::with_capacity(symbols.len());
        for (index, text) in symbols.iter().enumerate() {
            if let Some(text) = text {
                sids.entry(text.clone()).or_insert(index + 1);
            }
        }
        SharedSymbolTable {
            name,
            version,
            symbols,
            sids,
            substitute,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn max_id(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_substitute(&self) -> bool {
        self.substitute
    }

    pub fn find_known_symbol(&self, sid: usize) -> Option<&str> {
        match sid {
            0 => None,
            sid => self.symbols.get(sid - 1).and_then(|text| text.as_deref()),
        }
    }

    pub fn find_symbol(&self, text: &str) -> Option<usize> {
        self.sids.get(text).copied()
    }

    /// Symbol text in SID order, starting at SID 1.
    pub fn symbols(&self) -> impl Iterator<Item = Option<&str>> {
        self.symbols.iter().map(|text| text.as_deref())
    }

    pub fn into_shared(self) -> Arc<SharedSymbolTable> {
        Arc::new(self)
    }
}
