use crate::binary::IonType;

/// A buffered byte range, `start` inclusive and `end` exclusive, tagged with the type of the value
/// (or sub-field) it covers.
///
/// Marker indices are relative to the cursor's buffer. They are only meaningful until the cursor
/// moves to another value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Marker {
    pub ion_type: Option<IonType>,
    pub start: usize,
    pub end: usize,
}

impl Marker {
    pub fn new(ion_type: Option<IonType>, start: usize, end: usize) -> Marker {
        Marker {
            ion_type,
            start,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
