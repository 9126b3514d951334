use std::io;
use thiserror::Error;

/// Result type returned by every fallible cursor, reader and symbol table operation.
pub type IonResult<T> = Result<T, IonError>;

#[derive(Error, Debug)]
pub enum IonError {
    #[error("invalid binary Ion: {0}")]
    Format(#[from] FormatError),
    #[error("unexpected end of stream at offset {offset}")]
    Truncation { offset: u64 },
    #[error("value of {length} bytes exceeds the maximum buffer size of {maximum} bytes")]
    Oversized { length: usize, maximum: usize },
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
    #[error("{0}")]
    Symbol(#[from] SymbolError),
    #[error("error reading from the byte source: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum FormatError {
    #[error("{0}")]
    Binary(#[from] BinaryFormatError),
    #[error("text is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
}

#[derive(Error, Debug, PartialEq)]
pub enum BinaryFormatError {
    #[error("invalid type descriptor 0x{0:02X}")]
    TypeDescriptor(u8),
    #[error("bool length code must be 0, 1 or 15, found {0}")]
    BoolValue(u8),
    #[error("negative int with a zero magnitude")]
    NegativeZero,
    #[error("float length code must be 0, 4, 8 or 15, found {0}")]
    FloatLength(u8),
    #[error("timestamp length code must be at least 2, found {0}")]
    TimestampLength(u8),
    #[error("invalid annotation wrapper length code {0}")]
    AnnotationLength(u8),
    #[error("annotation wrapper declares no annotations")]
    EmptyAnnotations,
    #[error("annotation wrapper length does not match the length of the wrapped value")]
    AnnotatedValueLength,
    #[error("annotation wrapper wraps a {0}")]
    AnnotatedValueType(&'static str),
    #[error("the type code 15 is illegal in Ion 1.0")]
    ReservedTypeCode,
    #[error("unsupported Ion version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },
    #[error("variable-length field does not fit in {0} bits")]
    VarFieldOverflow(u32),
    #[error("value extends beyond the end of its container")]
    ContainerOverflow,
    #[error("invalid timestamp: {0}")]
    Timestamp(&'static str),
    #[error("malformed {0} subfield")]
    Subfield(&'static str),
    #[error("value header is longer than the maximum buffer size of {0} bytes")]
    HeaderLength(usize),
}

#[derive(Error, Debug, PartialEq)]
pub enum ProtocolError {
    #[error("multiple `imports` fields found within a single local symbol table")]
    DuplicateImports,
    #[error("multiple `symbols` fields found within a single local symbol table")]
    DuplicateSymbols,
    #[error("cannot append symbols to a {0} symbol table")]
    AppendToNonLocalTable(&'static str),
    #[error("span was not produced by this reader")]
    ForeignSpan,
    #[error("reader is not positioned on a value")]
    NotPositioned,
    #[error("cannot step into a {0}")]
    NotAContainer(&'static str),
    #[error("cannot step out at the top level")]
    AtTopLevel,
    #[error("expected a {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("the current value is null")]
    NullValue,
    #[error("the integer value does not fit in an i64")]
    IntegerOverflow,
    #[error("cannot read from a closed reader")]
    Closed,
    #[error("invalid buffer configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("spans are only supported by readers over a fixed byte array")]
    SpansUnsupported,
}

#[derive(Error, Debug, PartialEq)]
pub enum SymbolError {
    #[error("invalid symbol_id {symbol_id:?} is greater than max_id {max_id:?}")]
    AboveMaxId { max_id: usize, symbol_id: usize },
    #[error("the text for SID `{0}` is unknown")]
    UnknownSymbolText(usize),
    #[error("{reason} in symbol text at position {position}")]
    InvalidText {
        position: usize,
        reason: &'static str,
    },
    #[error("cannot intern into a read-only local symbol table")]
    ReadOnlyTable,
    #[error("cannot intern new symbol `{text}` into the immutable table `{name}`")]
    ImmutableTable { name: String, text: String },
    #[error(
        "import of shared table {name:?} lacks a valid max_id field, \
         but an exact match was not found in the catalog"
    )]
    MissingMaxId { name: String, version: u32 },
}

impl From<BinaryFormatError> for IonError {
    fn from(error: BinaryFormatError) -> Self {
        IonError::Format(FormatError::Binary(error))
    }
}

impl From<std::str::Utf8Error> for IonError {
    fn from(error: std::str::Utf8Error) -> Self {
        IonError::Format(FormatError::InvalidUtf8 {
            valid_up_to: error.valid_up_to(),
        })
    }
}
