use std::io::Read;
use std::sync::Arc;

use crate::cursor::IonCursor;
use crate::error::{IonResult, ProtocolError};
use crate::reader::IonReader;
use crate::symbols::Catalog;

/// Initial size of a stream reader's buffer.
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 32 * 1024;

/// Sizing of the buffer that stream-backed input is read into.
///
/// A value whose encoding (including its annotation wrapper) is larger than
/// `maximum_buffer_size` is oversized. Readers over a fixed byte array ignore this setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferConfiguration {
    initial_buffer_size: usize,
    maximum_buffer_size: usize,
}

impl Default for BufferConfiguration {
    fn default() -> Self {
        Self {
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
            maximum_buffer_size: usize::MAX,
        }
    }
}

impl BufferConfiguration {
    pub fn new(initial_buffer_size: usize, maximum_buffer_size: usize) -> IonResult<Self> {
        if initial_buffer_size == 0 {
            return Err(
                ProtocolError::InvalidConfiguration("initial buffer size must be positive").into(),
            );
        }
        if initial_buffer_size > maximum_buffer_size {
            return Err(ProtocolError::InvalidConfiguration(
                "initial buffer size exceeds the maximum buffer size",
            )
            .into());
        }
        Ok(Self {
            initial_buffer_size,
            maximum_buffer_size,
        })
    }

    /// A configuration with the default initial size (or `maximum_buffer_size`, if smaller).
    pub fn with_maximum_buffer_size(maximum_buffer_size: usize) -> IonResult<Self> {
        Self::new(
            DEFAULT_INITIAL_BUFFER_SIZE.min(maximum_buffer_size),
            maximum_buffer_size,
        )
    }

    pub fn initial_buffer_size(&self) -> usize {
        self.initial_buffer_size
    }

    pub fn maximum_buffer_size(&self) -> usize {
        self.maximum_buffer_size
    }

    pub fn is_bounded(&self) -> bool {
        self.maximum_buffer_size != usize::MAX
    }
}

/// Builds [`IonReader`]s.
///
/// ```
/// use ion_cursor::reader::{BufferConfiguration, ReaderBuilder};
///
/// let reader = ReaderBuilder::new()
///     .with_incremental_reading_enabled(true)
///     .with_buffer_configuration(BufferConfiguration::with_maximum_buffer_size(1024).unwrap())
///     .build_from_bytes(vec![0xE0, 0x01, 0x00, 0xEA]);
/// assert!(reader.is_incremental());
/// ```
#[derive(Clone, Default)]
pub struct ReaderBuilder {
    incremental: bool,
    buffer_configuration: BufferConfiguration,
    catalog: Option<Arc<dyn Catalog>>,
}

impl ReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, running out of input is never an error until [`IonReader::end_stream`] is
    /// called: `next()` reports "no value yet" and may be called again once more bytes arrive.
    pub fn with_incremental_reading_enabled(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    pub fn with_buffer_configuration(mut self, configuration: BufferConfiguration) -> Self {
        self.buffer_configuration = configuration;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build_from_bytes(self, bytes: impl Into<Vec<u8>>) -> IonReader {
        let cursor = IonCursor::from_bytes(bytes.into(), self.incremental);
        IonReader::new(cursor, self.catalog)
    }

    pub fn build_from_reader(self, source: impl Read + 'static) -> IonReader {
        let cursor = IonCursor::from_reader(
            Box::new(source),
            self.buffer_configuration,
            self.incremental,
        );
        IonReader::new(cursor, self.catalog)
    }
}
