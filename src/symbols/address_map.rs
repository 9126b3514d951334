use std::collections::HashMap;

/// A growable, append-only, bidirectional map between addresses (symbol IDs) and symbol text.
///
/// Every assigned text gets the next address, even when it is already present; looking text up
/// returns the lowest address it was assigned. `None` reserves an address with unknown text.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct AddressMap {
    texts: Vec<Option<String>>,
    addresses: HashMap<String, usize>,
}

impl AddressMap {
    pub(crate) fn new() -> AddressMap {
        AddressMap::default()
    }

    pub(crate) fn assign(&mut self, text: Option<String>) -> usize {
        let address = self.texts.len();
        if let Some(text) = &text {
            if !self.addresses.contains_key(text) {
                self.addresses.insert(text.clone(), address);
            }
        }
        self.texts.push(text);
        address
    }

    pub(crate) fn text(&self, address: usize) -> Option<&str> {
        self.texts.get(address).and_then(|text| text.as_deref())
    }

    pub(crate) fn address(&self, text: &str) -> Option<usize> {
        self.addresses.get(text).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.texts.len()
    }

    /// Drops every address at or beyond `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len < self.texts.len() {
            self.texts.truncate(len);
            self.addresses.retain(|_, address| *address < len);
        }
    }

    /// True if `other` holds exactly the same text at each of its addresses.
    pub(crate) fn is_extension_of(&self, other: &AddressMap) -> bool {
        other.len() <= self.len() && self.texts[..other.len()] == other.texts[..]
    }

    pub(crate) fn iter_from(&self, start: usize) -> impl Iterator<Item = Option<&str>> {
        self.texts
            .iter()
            .skip(start)
            .map(|text| text.as_deref())
    }
}
