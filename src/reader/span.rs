//! Spans: positions of values that a reader can later return to.
//!
//! Only readers over a fixed byte array can seek, so only they provide spans. Whether a reader
//! does is asked with [`IonReader::supports`].

use crate::error::{IonResult, ProtocolError};
use crate::reader::IonReader;
use crate::symbols::SymbolTable;

/// The optional capabilities a reader may provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Facet {
    SpanProvider,
    SeekableReader,
    RawValueSpanProvider,
}

/// The position of one value, together with the symbol table needed to read it.
#[derive(Clone, Debug)]
pub struct Span {
    start: u64,
    end: u64,
    symbol_table: SymbolTable,
    reader_id: usize,
}

impl Span {
    /// Offset of the value's first byte (its annotation wrapper, if it has one).
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }
}

/// The representation of the current value within the reader's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawValueSpan {
    pub start: usize,
    pub end: usize,
}

impl RawValueSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

pub trait SpanProvider {
    /// The span of the current value.
    fn current_span(&self) -> IonResult<Span>;
}

pub trait SeekableReader {
    /// Repositions the reader on the value of `span`. The next call to `next()` returns that
    /// value; the reader then reports the end of the data.
    fn hoist(&mut self, span: &Span) -> IonResult<()>;
}

pub trait RawValueSpanProvider {
    fn value_span(&self) -> IonResult<RawValueSpan>;

    /// The bytes a [`RawValueSpan`] indexes into.
    fn buffer(&self) -> &[u8];
}

impl IonReader {
    pub fn supports(&self, facet: Facet) -> bool {
        match facet {
            Facet::SpanProvider | Facet::SeekableReader | Facet::RawValueSpanProvider => {
                self.cursor.is_fixed()
            }
        }
    }

    pub fn span_provider(&self) -> Option<&dyn SpanProvider> {
        if self.supports(Facet::SpanProvider) {
            Some(self)
        } else {
            None
        }
    }

    pub fn seekable(&mut self) -> Option<&mut dyn SeekableReader> {
        if self.supports(Facet::SeekableReader) {
            Some(self)
        } else {
            None
        }
    }

    pub fn raw_value_span_provider(&self) -> Option<&dyn RawValueSpanProvider> {
        if self.supports(Facet::RawValueSpanProvider) {
            Some(self)
        } else {
            None
        }
    }

    fn check_spans(&self) -> IonResult<()> {
        if !self.cursor.is_fixed() {
            return Err(ProtocolError::SpansUnsupported.into());
        }
        if self.current.is_none() {
            return Err(ProtocolError::NotPositioned.into());
        }
        Ok(())
    }
}

impl SpanProvider for IonReader {
    fn current_span(&self) -> IonResult<Span> {
        self.check_spans()?;
        let (start, end) = self
            .cursor
            .value_range()
            .ok_or(ProtocolError::NotPositioned)?;
        Ok(Span {
            start,
            end,
            symbol_table: self.symbol_table.clone(),
            reader_id: self.id,
        })
    }
}

impl SeekableReader for IonReader {
    fn hoist(&mut self, span: &Span) -> IonResult<()> {
        self.check_open()?;
        if span.reader_id != self.id {
            return Err(ProtocolError::ForeignSpan.into());
        }
        self.cursor.seek(span.start, span.end)?;
        self.cursor.take_version_marker();
        self.symbol_table = span.symbol_table.clone();
        self.current = None;
        self.awaiting_fill = false;
        Ok(())
    }
}

impl RawValueSpanProvider for IonReader {
    fn value_span(&self) -> IonResult<RawValueSpan> {
        self.check_spans()?;
        let marker = self
            .cursor
            .value_marker()
            .ok_or(ProtocolError::NotPositioned)?;
        Ok(RawValueSpan {
            start: marker.start,
            end: marker.end,
        })
    }

    fn buffer(&self) -> &[u8] {
        self.cursor.buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::IonType;
    use crate::error::IonError;
    use crate::reader::ReaderBuilder;
    use hex::decode;
    use pretty_assertions::assert_eq;

    #[test]
    fn hoisting_rereads_a_value() {
        // [1, 2] then "x"
        let mut reader =
            ReaderBuilder::new().build_from_bytes(decode("e00100eab4210121028178").unwrap());
        assert_eq!(reader.next().unwrap(), Some(IonType::List));
        let span = reader.span_provider().unwrap().current_span().unwrap();
        assert_eq!((span.start(), span.end()), (4, 9));
        assert_eq!(reader.next().unwrap(), Some(IonType::String));

        reader.seekable().unwrap().hoist(&span).unwrap();
        assert_eq!(reader.next().unwrap(), Some(IonType::List));
        reader.step_in().unwrap();
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.i64_value().unwrap(), 1);
        reader.step_out().unwrap();
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn raw_value_spans() {
        let mut reader = ReaderBuilder::new().build_from_bytes(decode("e00100ea826869").unwrap());
        reader.next().unwrap();
        let provider = reader.raw_value_span_provider().unwrap();
        let span = provider.value_span().unwrap();
        assert_eq!(&provider.buffer()[span.start..span.end], b"hi");
    }

    #[test]
    fn spans_from_another_reader_are_rejected() {
        let bytes = decode("e00100ea2101").unwrap();
        let mut first = ReaderBuilder::new().build_from_bytes(bytes.clone());
        let mut second = ReaderBuilder::new().build_from_bytes(bytes);
        first.next().unwrap();
        let span = first.current_span().unwrap();
        assert!(matches!(
            second.hoist(&span),
            Err(IonError::Protocol(ProtocolError::ForeignSpan))
        ));
    }

    #[test]
    fn stream_readers_have_no_facets() {
        let reader = ReaderBuilder::new().build_from_reader(std::io::empty());
        assert!(!reader.supports(Facet::SpanProvider));
        assert!(!reader.supports(Facet::SeekableReader));
        assert!(reader.span_provider().is_none());
        assert!(reader.raw_value_span_provider().is_none());
    }
}
