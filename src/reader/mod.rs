//! The application-facing reader.
//!
//! [`IonReader`] sits on top of an [`IonCursor`]. It hides system values (version markers,
//! local symbol table directives and `$ion_1_0` symbols), resolves symbol IDs against the active
//! symbol table and decodes scalars on demand.

pub mod builder;
mod directive;
pub mod span;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

pub use self::builder::{BufferConfiguration, ReaderBuilder};
pub use self::span::{Facet, RawValueSpan, RawValueSpanProvider, SeekableReader, Span, SpanProvider};

use crate::binary::scalar;
use crate::binary::{IonType, TypeDescriptor};
use crate::cursor::{Event, IonCursor};
use crate::error::{IonError, IonResult, ProtocolError, SymbolError};
use crate::symbols::system::{ION_1_0_SID, ION_SYMBOL_TABLE_SID};
use crate::symbols::{Catalog, LocalSymbolTable, SymbolTable, SymbolToken};
use crate::types::{Decimal, Timestamp};

static NEXT_READER_ID: AtomicUsize = AtomicUsize::new(0);

/// Reads binary Ion from a fixed byte array or a byte stream.
///
/// An incremental reader never fails for lack of input: [`IonReader::next`] returns `Ok(None)`
/// until a complete top-level value has arrived, and may be called again once more bytes are
/// available. Only after [`IonReader::end_stream`] is an incomplete value an error.
///
/// A non-incremental reader treats a zero-length read as the end of the stream and fills values
/// lazily, when they are first accessed.
pub struct IonReader {
    cursor: IonCursor,
    catalog: Option<Arc<dyn Catalog>>,
    symbol_table: SymbolTable,
    // the table handed out by the last successful `pop_passed_symbol_table`
    passed_table: Option<SymbolTable>,
    current: Option<IonType>,
    // a top-level value whose header was read but whose body has not fully arrived
    awaiting_fill: bool,
    closed: bool,
    id: usize,
}

impl IonReader {
    pub fn new(cursor: IonCursor, catalog: Option<Arc<dyn Catalog>>) -> IonReader {
        IonReader {
            cursor,
            catalog,
            symbol_table: SymbolTable::System,
            passed_table: None,
            current: None,
            awaiting_fill: false,
            closed: false,
            id: NEXT_READER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn is_incremental(&self) -> bool {
        self.cursor.is_continuable()
    }

    /// Moves to the next application value at the current depth.
    ///
    /// Returns `Ok(None)` at the end of a container, and at the top level when no complete value
    /// is available (yet, for an incremental reader).
    pub fn next(&mut self) -> IonResult<Option<IonType>> {
        self.check_open()?;
        if self.cursor.depth() > 0 {
            return self.next_child();
        }
        loop {
            if self.awaiting_fill {
                self.awaiting_fill = false;
            } else {
                let event = self.cursor.next_value()?;
                if self.cursor.take_version_marker() {
                    debug!("version marker: resetting to the system symbol table");
                    self.symbol_table = SymbolTable::System;
                }
                match event {
                    Event::StartScalar | Event::StartContainer => {}
                    Event::Oversized => continue,
                    _ => {
                        self.current = None;
                        return Ok(None);
                    }
                }
            }

            if self.cursor.is_continuable() {
                match self.cursor.fill_value()? {
                    Event::ValueReady => {}
                    Event::Oversized if self.is_symbol_table_directive() => {
                        return Err(self.oversized());
                    }
                    Event::Oversized => continue,
                    _ => {
                        self.awaiting_fill = true;
                        self.current = None;
                        return Ok(None);
                    }
                }
            }

            if self.is_symbol_table_directive() {
                // a blocking reader has not filled the directive yet
                self.cursor.require_value()?;
                let table = self.read_symbol_table_directive()?;
                debug!(
                    "installed a local symbol table with max id {}",
                    table.max_id()
                );
                self.symbol_table = table;
                continue;
            }
            if self.is_version_symbol()? {
                trace!("skipping a top-level $ion_1_0 symbol");
                continue;
            }
            self.current = self.cursor.ion_type();
            return Ok(self.current);
        }
    }

    /// Moves to the next value inside a container.
    fn next_child(&mut self) -> IonResult<Option<IonType>> {
        loop {
            match self.cursor.next_value()? {
                Event::StartScalar | Event::StartContainer => {
                    self.current = self.cursor.ion_type();
                    return Ok(self.current);
                }
                Event::Oversized => continue,
                _ => {
                    self.current = None;
                    return Ok(None);
                }
            }
        }
    }

    pub fn step_in(&mut self) -> IonResult<()> {
        self.check_open()?;
        if self.current.is_none() {
            return Err(ProtocolError::NotPositioned.into());
        }
        self.cursor.step_in()?;
        self.current = None;
        Ok(())
    }

    pub fn step_out(&mut self) -> IonResult<()> {
        self.check_open()?;
        self.cursor.step_out()?;
        self.current = None;
        Ok(())
    }

    /// Declares that the byte source will deliver nothing more.
    pub fn end_stream(&mut self) {
        self.cursor.end_stream();
    }

    /// Closes the reader.
    ///
    /// Closing an incremental reader while a value is only partly received is a truncation error;
    /// [`IonReader::end_stream`] and a final [`IonReader::next`] should come first.
    pub fn close(&mut self) -> IonResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.current = None;
        if self.cursor.is_continuable() && self.cursor.is_incomplete() {
            return Err(self.cursor.truncated());
        }
        Ok(())
    }

    pub fn ion_type(&self) -> Option<IonType> {
        self.current
    }

    pub fn is_null(&self) -> bool {
        self.current.is_some() && self.cursor.is_null()
    }

    pub fn depth(&self) -> usize {
        self.cursor.depth()
    }

    pub fn is_in_struct(&self) -> bool {
        self.cursor.is_in_struct()
    }

    pub fn has_annotations(&self) -> bool {
        self.current.is_some() && !self.cursor.annotation_sids().is_empty()
    }

    /// The (major, minor) version of the most recent version marker.
    pub fn ion_version(&self) -> (u8, u8) {
        self.cursor.version()
    }

    pub fn field_name_symbol(&self) -> IonResult<Option<SymbolToken>> {
        match self.current.and(self.cursor.field_sid()) {
            Some(sid) => Ok(Some(self.symbol_table.token(sid)?)),
            None => Ok(None),
        }
    }

    /// The text of the current field name. A field name whose text is unknown is an error.
    pub fn field_name(&self) -> IonResult<Option<String>> {
        match self.field_name_symbol()? {
            Some(token) => known_text(token).map(Some),
            None => Ok(None),
        }
    }

    pub fn annotation_symbols(&self) -> IonResult<Vec<SymbolToken>> {
        if self.current.is_none() {
            return Ok(Vec::new());
        }
        self.cursor
            .annotation_sids()
            .iter()
            .map(|sid| self.symbol_table.token(*sid).map_err(IonError::from))
            .collect()
    }

    pub fn annotations(&self) -> IonResult<Vec<String>> {
        self.annotation_symbols()?
            .into_iter()
            .map(known_text)
            .collect()
    }

    pub fn bool_value(&mut self) -> IonResult<bool> {
        let (descriptor, _) = self.representation(&[IonType::Bool], "bool")?;
        Ok(scalar::decode_bool(&descriptor)?)
    }

    pub fn big_int_value(&mut self) -> IonResult<BigInt> {
        let (descriptor, bytes) = self.representation(&[IonType::Int], "int")?;
        Ok(scalar::decode_int(&descriptor, bytes)?)
    }

    pub fn i64_value(&mut self) -> IonResult<i64> {
        self.big_int_value()?
            .to_i64()
            .ok_or_else(|| ProtocolError::IntegerOverflow.into())
    }

    pub fn f64_value(&mut self) -> IonResult<f64> {
        let (_, bytes) = self.representation(&[IonType::Float], "float")?;
        Ok(scalar::decode_float(bytes)?)
    }

    pub fn decimal_value(&mut self) -> IonResult<Decimal> {
        let (_, bytes) = self.representation(&[IonType::Decimal], "decimal")?;
        Ok(scalar::decode_decimal(bytes)?)
    }

    pub fn timestamp_value(&mut self) -> IonResult<Timestamp> {
        let (_, bytes) = self.representation(&[IonType::Timestamp], "timestamp")?;
        Ok(scalar::decode_timestamp(bytes)?)
    }

    /// The text of a string, or of a symbol whose text is known.
    pub fn string_value(&mut self) -> IonResult<String> {
        if self.current == Some(IonType::Symbol) {
            return known_text(self.symbol_value()?);
        }
        let (_, bytes) = self.representation(&[IonType::String], "string")?;
        Ok(std::str::from_utf8(bytes)?.to_string())
    }

    pub fn symbol_value(&mut self) -> IonResult<SymbolToken> {
        let (_, bytes) = self.representation(&[IonType::Symbol], "symbol")?;
        let sid = scalar::decode_symbol_id(bytes)?;
        Ok(self.symbol_table.token(sid)?)
    }

    /// The octets of a blob or clob.
    pub fn bytes_value(&mut self) -> IonResult<Vec<u8>> {
        let (_, bytes) = self.representation(&[IonType::Blob, IonType::Clob], "lob")?;
        Ok(bytes.to_vec())
    }

    /// The symbol table in effect for the current value.
    pub fn current_symbol_table(&self) -> SymbolTable {
        self.symbol_table.clone()
    }

    /// Hands the active symbol table to a downstream consumer, once per table instance.
    ///
    /// Returns `None` if the active table was already handed out. A local table is returned as an
    /// independent copy, so later directives cannot change what the consumer sees.
    pub fn pop_passed_symbol_table(&mut self) -> Option<SymbolTable> {
        if let Some(passed) = &self.passed_table {
            if passed.same_table(&self.symbol_table) {
                return None;
            }
        }
        self.passed_table = Some(self.symbol_table.clone());
        Some(match &self.symbol_table {
            SymbolTable::Local(table) => SymbolTable::Local(Arc::new(table.make_copy())),
            other => other.clone(),
        })
    }

    /// Same as [`IonReader::pop_passed_symbol_table`].
    pub fn take_symbol_table(&mut self) -> Option<SymbolTable> {
        self.pop_passed_symbol_table()
    }

    fn check_open(&self) -> IonResult<()> {
        if self.closed {
            Err(ProtocolError::Closed.into())
        } else {
            Ok(())
        }
    }

    fn oversized(&self) -> IonError {
        let length = self
            .cursor
            .value_range()
            .map_or(0, |(start, end)| (end - start) as usize);
        IonError::Oversized {
            length,
            maximum: self.cursor.buffer_configuration().maximum_buffer_size(),
        }
    }

    /// The descriptor and buffered representation of the current non-null value, which must be
    /// one of `expected`.
    fn representation(
        &mut self,
        expected: &[IonType],
        name: &'static str,
    ) -> IonResult<(TypeDescriptor, &[u8])> {
        let found = self.current.ok_or(ProtocolError::NotPositioned)?;
        if !expected.contains(&found) {
            return Err(ProtocolError::TypeMismatch {
                expected: name,
                found: found.name(),
            }
            .into());
        }
        if self.cursor.is_null() {
            return Err(ProtocolError::NullValue.into());
        }
        let descriptor = self.cursor.require_value()?.descriptor;
        let bytes = self
            .cursor
            .value_bytes()
            .ok_or(ProtocolError::NotPositioned)?;
        Ok((descriptor, bytes))
    }

    fn is_symbol_table_directive(&self) -> bool {
        self.cursor.depth() == 0
            && self.cursor.ion_type() == Some(IonType::Struct)
            && self.cursor.annotation_sids().first() == Some(&ION_SYMBOL_TABLE_SID)
    }

    /// True for an unannotated top-level `$ion_1_0` symbol, which is a no-op.
    fn is_version_symbol(&mut self) -> IonResult<bool> {
        if self.cursor.depth() > 0
            || self.cursor.ion_type() != Some(IonType::Symbol)
            || self.cursor.is_null()
            || !self.cursor.annotation_sids().is_empty()
        {
            return Ok(false);
        }
        self.cursor.require_value()?;
        let bytes = self
            .cursor
            .value_bytes()
            .ok_or(ProtocolError::NotPositioned)?;
        Ok(scalar::decode_symbol_id(bytes)? == ION_1_0_SID)
    }

    fn local_table(&self) -> Option<&Arc<LocalSymbolTable>> {
        self.symbol_table.as_local()
    }
}

fn known_text(token: SymbolToken) -> IonResult<String> {
    match token {
        SymbolToken {
            text: Some(text), ..
        } => Ok(text),
        SymbolToken { sid, .. } => Err(SymbolError::UnknownSymbolText(sid.unwrap_or(0)).into()),
    }
}

impl std::fmt::Debug for IonReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IonReader")
            .field("id", &self.id)
            .field("cursor", &self.cursor)
            .field("symbol_table", &self.symbol_table)
            .field("current", &self.current)
            .field("closed", &self.closed)
            .finish()
    }
}
