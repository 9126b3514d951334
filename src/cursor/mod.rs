//! An incremental cursor over binary Ion.
//!
//! The cursor turns a byte source into positioning events without ever failing for lack of data:
//! when a type descriptor or length subfield is only partly buffered it reports
//! [`Event::NeedsData`] and, on the next call, re-parses the header from its first byte.
//!
//! Buffer indices (markers, container ends) are relative to the start of the buffer. The buffer is
//! only compacted immediately before a new header is parsed, at which point every live index is
//! shifted by the number of bytes dropped.

pub(crate) mod source;

use std::io::Read;
use std::mem;

use log::{debug, trace, warn};

use self::source::{Input, Source};
use crate::binary::marker::Marker;
use crate::binary::subfield::var_uint_at;
use crate::binary::{version_marker, IonType, TypeCode, TypeDescriptor, BVM_LENGTH, BVM_START};
use crate::error::{BinaryFormatError, IonError, IonResult, ProtocolError};
use crate::reader::builder::BufferConfiguration;

/// What the cursor found on its last move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The input is exhausted, for now or for good.
    NeedsData,
    /// The cursor is between values and waiting to be moved.
    NeedsInstruction,
    /// A scalar's header is buffered; its representation may not be.
    StartScalar,
    /// A container's header is buffered; its contents may not be.
    StartContainer,
    /// The current container has no more values.
    EndContainer,
    /// The current value is buffered in its entirety.
    ValueReady,
    /// The current value is larger than the maximum buffer size and will be skipped.
    Oversized,
}

/// The recognized header of the current value.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueHeader {
    pub descriptor: TypeDescriptor,
    pub field_sid: Option<usize>,
    pub annotations: Vec<usize>,
    /// Start of the annotation wrapper, or of the type descriptor when there is none.
    pub start: usize,
    /// The representation.
    pub marker: Marker,
}

impl ValueHeader {
    pub fn ion_type(&self) -> Option<IonType> {
        self.descriptor.ion_type
    }

    pub fn end(&self) -> usize {
        self.marker.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Frame {
    ion_type: IonType,
    end: usize,
}

#[derive(Debug, PartialEq)]
enum Header {
    /// Not completely buffered. `end` is known once an annotation wrapper's length has been read.
    Incomplete { end: Option<usize> },
    Nop { end: usize },
    VersionMarker { major: u8, minor: u8, end: usize },
    Value(ValueHeader),
}

fn add(a: usize, b: usize) -> Result<usize, BinaryFormatError> {
    a.checked_add(b)
        .ok_or(BinaryFormatError::VarFieldOverflow(usize::BITS))
}

/// Reads a VarUInt, bailing out of the enclosing parse if it is not completely buffered.
macro_rules! field {
    ($bytes:expr, $index:expr) => {
        field!($bytes, $index, None)
    };
    ($bytes:expr, $index:expr, $end:expr) => {
        match var_uint_at(&$bytes[$index..])? {
            Some(field) => field,
            None => return Ok(Header::Incomplete { end: $end }),
        }
    };
}

/// Recognizes the header starting at `start`. `bytes` ends at the end of the buffered data or of
/// the enclosing container, whichever comes first.
fn parse_header(
    bytes: &[u8],
    start: usize,
    in_struct: bool,
    at_top_level: bool,
) -> Result<Header, BinaryFormatError> {
    let mut index = start;
    let field_sid = if in_struct {
        let (sid, length) = field!(bytes, index);
        index += length;
        Some(sid)
    } else {
        None
    };

    let byte = match bytes.get(index) {
        Some(byte) => *byte,
        None => return Ok(Header::Incomplete { end: None }),
    };
    if at_top_level && byte == BVM_START {
        if bytes.len() < index + BVM_LENGTH {
            return Ok(Header::Incomplete { end: None });
        }
        let (major, minor) = version_marker(&bytes[index..index + BVM_LENGTH])?;
        return Ok(Header::VersionMarker {
            major,
            minor,
            end: index + BVM_LENGTH,
        });
    }

    let value_start = index;
    let mut descriptor = TypeDescriptor::from_byte(byte);
    descriptor.check()?;

    let mut annotations = Vec::new();
    let mut wrapper_end = None;
    if descriptor.is_annotation_wrapper() {
        index += 1;
        let length = if descriptor.variable_length {
            let (length, octets) = field!(bytes, index);
            index += octets;
            length
        } else {
            descriptor.inline_length
        };
        let end = add(index, length)?;

        let (annotations_length, octets) = field!(bytes, index, Some(end));
        index += octets;
        if annotations_length == 0 {
            return Err(BinaryFormatError::EmptyAnnotations);
        }
        let annotations_end = add(index, annotations_length)?;
        if annotations_end >= end {
            return Err(BinaryFormatError::AnnotatedValueLength);
        }
        while index < annotations_end {
            let (sid, octets) = field!(bytes, index, Some(end));
            index += octets;
            annotations.push(sid);
        }
        if index != annotations_end {
            return Err(BinaryFormatError::AnnotatedValueLength);
        }

        let byte = match bytes.get(index) {
            Some(byte) => *byte,
            None => return Ok(Header::Incomplete { end: Some(end) }),
        };
        descriptor = TypeDescriptor::from_byte(byte);
        descriptor.check()?;
        if descriptor.is_nop_pad {
            return Err(BinaryFormatError::AnnotatedValueType("NOP pad"));
        }
        if descriptor.type_code == TypeCode::Annotation {
            return Err(BinaryFormatError::AnnotatedValueType("annotation wrapper"));
        }
        wrapper_end = Some(end);
    }

    index += 1;
    let length = if descriptor.variable_length {
        let (length, octets) = field!(bytes, index, wrapper_end);
        index += octets;
        length
    } else {
        descriptor.inline_length
    };
    let end = add(index, length)?;

    if descriptor.is_nop_pad {
        return Ok(Header::Nop { end });
    }
    if let Some(wrapper_end) = wrapper_end {
        if wrapper_end != end {
            return Err(BinaryFormatError::AnnotatedValueLength);
        }
    }

    Ok(Header::Value(ValueHeader {
        descriptor,
        field_sid,
        annotations,
        start: value_start,
        marker: Marker::new(descriptor.ion_type, index, end),
    }))
}

/// A cursor over binary Ion read from a fixed byte array or from an [`std::io::Read`].
///
/// In *continuable* mode exhausting the source is never an error: it is reported as
/// [`Event::NeedsData`] until [`IonCursor::end_stream`] declares that nothing more will arrive.
/// Otherwise a zero-length read marks the end of the stream and exhausting it in the middle of a
/// value is a truncation error.
#[derive(Debug)]
pub struct IonCursor {
    buffer: Vec<u8>,
    source: Source,
    configuration: BufferConfiguration,
    continuable: bool,
    stream_ended: bool,
    /// Stream offset of `buffer[0]`.
    buffer_offset: u64,
    /// Where the next header starts. May lie beyond the buffered bytes.
    position: usize,
    frames: Vec<Frame>,
    value: Option<ValueHeader>,
    event: Event,
    /// End of the top level when reading is restricted to a single value.
    limit: Option<usize>,
    version: (u8, u8),
    version_marker_seen: bool,
}

impl IonCursor {
    /// A cursor whose entire input is `bytes`.
    pub fn from_bytes(bytes: Vec<u8>, continuable: bool) -> IonCursor {
        IonCursor::new(bytes, Source::Fixed, BufferConfiguration::default(), continuable)
    }

    pub fn from_reader(
        reader: Box<dyn Read>,
        configuration: BufferConfiguration,
        continuable: bool,
    ) -> IonCursor {
        IonCursor::new(
            Vec::with_capacity(configuration.initial_buffer_size()),
            Source::Stream(reader),
            configuration,
            continuable,
        )
    }

    fn new(
        buffer: Vec<u8>,
        source: Source,
        configuration: BufferConfiguration,
        continuable: bool,
    ) -> IonCursor {
        IonCursor {
            stream_ended: source.is_fixed(),
            buffer,
            source,
            configuration,
            continuable,
            buffer_offset: 0,
            position: 0,
            frames: Vec::new(),
            value: None,
            event: Event::NeedsInstruction,
            limit: None,
            version: (1, 0),
            version_marker_seen: false,
        }
    }

    /// Moves to the next value at the current depth, skipping whatever remains of the current one.
    pub fn next_value(&mut self) -> IonResult<Event> {
        self.value = None;
        loop {
            if self.position > self.buffer.len() && !self.skip_unbuffered()? {
                return Ok(self.set_event(Event::NeedsData));
            }
            let container_end = self.container_end();
            if let Some(end) = container_end {
                if self.position >= end {
                    let event = if self.frames.is_empty() {
                        Event::NeedsData
                    } else {
                        Event::EndContainer
                    };
                    return Ok(self.set_event(event));
                }
            }
            self.compact();
            let container_end = self.container_end();

            let bound = container_end.map_or(self.buffer.len(), |end| end.min(self.buffer.len()));
            let header = parse_header(
                &self.buffer[..bound],
                self.position,
                self.is_in_struct(),
                self.frames.is_empty(),
            )?;

            let end = match &header {
                Header::Incomplete { .. } => None,
                Header::Nop { end } => Some(*end),
                Header::VersionMarker { end, .. } => Some(*end),
                Header::Value(value) => Some(value.end()),
            };
            if let (Some(end), Some(container_end)) = (end, container_end) {
                if end > container_end {
                    return Err(BinaryFormatError::ContainerOverflow.into());
                }
            }

            match header {
                Header::Incomplete { end } => {
                    if container_end.map_or(false, |end| end <= self.buffer.len()) {
                        return Err(BinaryFormatError::ContainerOverflow.into());
                    }
                    if let Some(maximum) = self.maximum() {
                        if self.buffer.len() - self.position >= maximum {
                            return self.oversized_header(end, maximum);
                        }
                    }
                    let wanted = self.buffer.len() + 1;
                    if !self.fill(wanted)? {
                        if !self.stream_ended {
                            return Ok(self.set_event(Event::NeedsData));
                        }
                        if self.position == self.buffer.len() && self.frames.is_empty() {
                            trace!("end of stream at offset {}", self.offset(self.position));
                            return Ok(self.set_event(Event::NeedsData));
                        }
                        return Err(self.truncated());
                    }
                }
                Header::Nop { end } => {
                    trace!("skipping {} bytes of padding", end - self.position);
                    self.position = end;
                }
                Header::VersionMarker { major, minor, end } => {
                    debug!(
                        "Ion {}.{} version marker at offset {}",
                        major,
                        minor,
                        self.offset(self.position)
                    );
                    self.version = (major, minor);
                    self.version_marker_seen = true;
                    self.position = end;
                }
                Header::Value(value) => {
                    trace!(
                        "{:?} header at offset {} ({} byte representation)",
                        value.ion_type(),
                        self.offset(value.start),
                        value.marker.len()
                    );
                    self.position = value.end();
                    let event = if value.descriptor.is_container() {
                        Event::StartContainer
                    } else {
                        Event::StartScalar
                    };
                    self.value = Some(value);
                    return Ok(self.set_event(event));
                }
            }
        }
    }

    /// Buffers the whole of the current value.
    ///
    /// Returns [`Event::Oversized`] without buffering anything if the value is larger than the
    /// maximum buffer size.
    pub fn fill_value(&mut self) -> IonResult<Event> {
        let (start, end) = match &self.value {
            Some(value) => (value.start, value.end()),
            None => return Err(ProtocolError::NotPositioned.into()),
        };
        if let Some(maximum) = self.maximum() {
            if end - start > maximum {
                warn!(
                    "skipping a value of {} bytes at offset {}; the maximum is {}",
                    end - start,
                    self.offset(start),
                    maximum
                );
                return Ok(self.set_event(Event::Oversized));
            }
        }
        if self.fill(end)? {
            trace!("filled {} bytes at offset {}", end - start, self.offset(start));
            return Ok(self.set_event(Event::ValueReady));
        }
        if self.stream_ended {
            return Err(self.truncated());
        }
        Ok(self.set_event(Event::NeedsData))
    }

    /// Like [`IonCursor::fill_value`], but a value that cannot be buffered is an error.
    pub fn require_value(&mut self) -> IonResult<&ValueHeader> {
        if !self.is_value_buffered() {
            match self.fill_value()? {
                Event::ValueReady => {}
                Event::Oversized => {
                    let length = match &self.value {
                        Some(value) => value.end() - value.start,
                        None => return Err(ProtocolError::NotPositioned.into()),
                    };
                    return Err(IonError::Oversized {
                        length,
                        maximum: self.configuration.maximum_buffer_size(),
                    });
                }
                _ => return Err(self.truncated()),
            }
        }
        self.value
            .as_ref()
            .ok_or_else(|| ProtocolError::NotPositioned.into())
    }

    pub fn step_in(&mut self) -> IonResult<()> {
        let value = self.value.take().ok_or(ProtocolError::NotPositioned)?;
        let ion_type = match value.ion_type() {
            Some(ion_type) if ion_type.is_container() => ion_type,
            other => {
                self.value = Some(value);
                let found = other.map_or("NOP pad", IonType::name);
                return Err(ProtocolError::NotAContainer(found).into());
            }
        };
        self.frames.push(Frame {
            ion_type,
            end: value.end(),
        });
        self.position = value.marker.start;
        self.set_event(Event::NeedsInstruction);
        Ok(())
    }

    /// Leaves the current container. Its unread contents are skipped by the next move, once they
    /// have been buffered.
    pub fn step_out(&mut self) -> IonResult<()> {
        let frame = self.frames.pop().ok_or(ProtocolError::AtTopLevel)?;
        self.position = frame.end;
        self.value = None;
        self.set_event(Event::NeedsInstruction);
        Ok(())
    }

    /// Declares that no more bytes will arrive.
    pub fn end_stream(&mut self) {
        self.stream_ended = true;
    }

    /// True if a value (or a header) has been started but not completely received.
    pub fn is_incomplete(&self) -> bool {
        match &self.value {
            Some(value) => value.end() > self.buffer.len(),
            None => {
                self.event == Event::NeedsData
                    && (self.position != self.buffer.len() || !self.frames.is_empty())
            }
        }
    }

    /// Returns (and clears) whether a version marker was passed since the last call.
    pub fn take_version_marker(&mut self) -> bool {
        mem::replace(&mut self.version_marker_seen, false)
    }

    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    pub fn current_event(&self) -> Event {
        self.event
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_in_struct(&self) -> bool {
        matches!(self.frames.last(), Some(Frame { ion_type: IonType::Struct, .. }))
    }

    pub fn value_header(&self) -> Option<&ValueHeader> {
        self.value.as_ref()
    }

    pub fn value_marker(&self) -> Option<Marker> {
        self.value.as_ref().map(|value| value.marker)
    }

    pub fn ion_type(&self) -> Option<IonType> {
        self.value.as_ref().and_then(ValueHeader::ion_type)
    }

    pub fn is_null(&self) -> bool {
        self.value
            .as_ref()
            .map_or(false, |value| value.descriptor.is_null)
    }

    pub fn field_sid(&self) -> Option<usize> {
        self.value.as_ref().and_then(|value| value.field_sid)
    }

    pub fn annotation_sids(&self) -> &[usize] {
        self.value
            .as_ref()
            .map_or(&[], |value| value.annotations.as_slice())
    }

    pub fn is_value_buffered(&self) -> bool {
        self.value
            .as_ref()
            .map_or(false, |value| value.end() <= self.buffer.len())
    }

    /// The representation of the current value, if it is buffered.
    pub fn value_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            Some(value) if value.end() <= self.buffer.len() => {
                Some(&self.buffer[value.marker.start..value.marker.end])
            }
            _ => None,
        }
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn buffer_configuration(&self) -> BufferConfiguration {
        self.configuration
    }

    pub fn is_fixed(&self) -> bool {
        self.source.is_fixed()
    }

    pub fn is_continuable(&self) -> bool {
        self.continuable
    }

    pub fn is_stream_ended(&self) -> bool {
        self.stream_ended
    }

    /// Stream offsets of the current value, from its annotation wrapper (if any) to its end.
    pub fn value_range(&self) -> Option<(u64, u64)> {
        self.value
            .as_ref()
            .map(|value| (self.offset(value.start), self.offset(value.end())))
    }

    /// Restricts the cursor to the top-level value occupying `start..end` of a fixed input.
    pub fn seek(&mut self, start: u64, end: u64) -> IonResult<()> {
        if !self.source.is_fixed() {
            return Err(ProtocolError::SpansUnsupported.into());
        }
        let start = (start - self.buffer_offset) as usize;
        let end = (end - self.buffer_offset) as usize;
        if start > end || end > self.buffer.len() {
            return Err(self.truncated());
        }
        self.frames.clear();
        self.value = None;
        self.position = start;
        self.limit = Some(end);
        self.set_event(Event::NeedsInstruction);
        Ok(())
    }

    fn set_event(&mut self, event: Event) -> Event {
        self.event = event;
        event
    }

    fn offset(&self, index: usize) -> u64 {
        self.buffer_offset + index as u64
    }

    pub(crate) fn truncated(&self) -> IonError {
        IonError::Truncation {
            offset: self.offset(self.buffer.len()),
        }
    }

    fn maximum(&self) -> Option<usize> {
        if self.source.is_fixed() || !self.configuration.is_bounded() {
            None
        } else {
            Some(self.configuration.maximum_buffer_size())
        }
    }

    /// A header that fills the whole buffer without being complete. An annotated value whose
    /// length is known is skipped by a continuable cursor and reported to a blocking one; a header
    /// whose length is unknown can never be read.
    fn oversized_header(&mut self, end: Option<usize>, maximum: usize) -> IonResult<Event> {
        if let (Some(end), Some(container_end)) = (end, self.container_end()) {
            if end > container_end {
                return Err(BinaryFormatError::ContainerOverflow.into());
            }
        }
        match end {
            Some(end) if self.continuable => {
                warn!(
                    "skipping an annotated value of {} bytes at offset {}; its header alone \
                     exceeds the maximum of {}",
                    end - self.position,
                    self.offset(self.position),
                    maximum
                );
                self.position = end;
                Ok(self.set_event(Event::Oversized))
            }
            Some(end) => Err(IonError::Oversized {
                length: end - self.position,
                maximum,
            }),
            None => Err(BinaryFormatError::HeaderLength(maximum).into()),
        }
    }

    fn container_end(&self) -> Option<usize> {
        match self.frames.last() {
            Some(frame) => Some(frame.end),
            None => self.limit,
        }
    }

    /// Drops consumed bytes from the front of the buffer once they make up at least half of it.
    fn compact(&mut self) {
        if self.source.is_fixed() || self.position == 0 || self.position < self.buffer.len() / 2 {
            return;
        }
        let consumed = self.position.min(self.buffer.len());
        if consumed > 0 {
            debug!(
                "compacting the buffer: dropping {} of {} bytes",
                consumed,
                self.buffer.len()
            );
        }
        self.buffer.drain(..consumed);
        self.shift(consumed);
    }

    fn shift(&mut self, by: usize) {
        self.buffer_offset += by as u64;
        self.position -= by;
        for frame in &mut self.frames {
            frame.end -= by;
        }
    }

    /// Reads and drops the bytes between the end of the buffer and `position`.
    fn skip_unbuffered(&mut self) -> IonResult<bool> {
        if self.source.is_fixed() {
            return Err(self.truncated());
        }
        let buffered = self.buffer.len();
        self.buffer.clear();
        self.shift(buffered);

        let (discarded, input) = self.source.discard(self.position, self.continuable)?;
        self.shift(discarded);
        trace!("skipped {} unbuffered bytes", discarded);
        if self.position == 0 {
            return Ok(true);
        }
        if input == Input::Exhausted {
            self.stream_ended = true;
        }
        if self.stream_ended {
            return Err(self.truncated());
        }
        Ok(false)
    }

    /// Reads until at least `needed_end` bytes are buffered. Returns false if the source has no
    /// more bytes, for now or for good.
    fn fill(&mut self, needed_end: usize) -> IonResult<bool> {
        while self.buffer.len() < needed_end {
            if self.source.is_fixed() {
                return Ok(false);
            }
            let start = self.buffer.len();
            let want = (needed_end - start).max(self.configuration.initial_buffer_size());
            if start + want > self.buffer.capacity() {
                debug!("growing the buffer to {} bytes", start + want);
            }
            self.buffer.resize(start + want, 0);
            let input = self
                .source
                .read_into(&mut self.buffer[start..], self.continuable);
            let read = match &input {
                Ok(Input::Bytes(read)) => *read,
                _ => 0,
            };
            self.buffer.truncate(start + read);
            match input? {
                Input::Bytes(read) => trace!("read {} bytes", read),
                Input::Pending => return Ok(false),
                Input::Exhausted => {
                    self.stream_ended = true;
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
