//! Special values and types related to the binary Ion format.

pub mod marker;
pub mod scalar;
pub mod subfield;

use crate::error::BinaryFormatError;
use num_traits::cast::FromPrimitive;

/// ## Binary Version Markers
///
/// In the binary format, an Ion value stream starts with a four-octet binary version marker (BVM)
/// that specifies the Ion version used to encode the data that follows, followed by zero or more
/// values which contain the actual data. These values are generally referred to as
/// “top-level values”.
///
/// ```text
///                        7    0 7     0 7     0 7    0
///                       +------+-------+-------+------+
/// binary version marker | 0xE0 | major | minor | 0xEA |
///                       +------+-------+-------+------+
/// ```
/// The first octet is 0xE0 and the fourth octet is 0xEA.
/// The second and third octets contain major and minor version numbers.
/// The only currently valid BVM, identifying Ion 1.0, is 0xE0 0x01 0x00 0xEA.
///
/// A value stream can contain other BVMs interspersed with the top-level values.
/// Each BVM resets the reader to the initial state for the given Ion version.
pub const BVM_1_0: [u8; 4] = [
    BVM_START,
    BVM_1_0_MAJOR_VERSION,
    BVM_1_0_MINOR_VERSION,
    BVM_END,
];
pub const BVM_LENGTH: usize = 4;
pub(crate) const BVM_START: u8 = 0xE0;
pub(crate) const BVM_END: u8 = 0xEA;
pub(crate) const BVM_1_0_MAJOR_VERSION: u8 = 0x01;
pub(crate) const BVM_1_0_MINOR_VERSION: u8 = 0x00;

/// Checks the four octets of a binary version marker, returning the (major, minor) version.
pub(crate) fn version_marker(bytes: &[u8]) -> Result<(u8, u8), BinaryFormatError> {
    match bytes {
        [BVM_START, BVM_1_0_MAJOR_VERSION, BVM_1_0_MINOR_VERSION, BVM_END] => {
            Ok((BVM_1_0_MAJOR_VERSION, BVM_1_0_MINOR_VERSION))
        }
        [BVM_START, major, minor, BVM_END] => Err(BinaryFormatError::UnsupportedVersion {
            major: *major,
            minor: *minor,
        }),
        _ => Err(BinaryFormatError::TypeDescriptor(BVM_START)),
    }
}

/// ## Typed Value Formats
///
/// A value consists of a one-octet type descriptor, possibly followed by a length in octets,
/// possibly followed by a representation.
///
/// ```text
///        7       4 3       0
///       +---------+---------+
/// value |    T    |    L    |
///       +---------+---------+======+
///       :     length [VarUInt]     :
///       +==========================+
///       :      representation      :
///       +==========================+
/// ```
///
/// The type descriptor octet has two subfields: a four-bit type code T, and a four-bit length L.
///
/// If the value is null (for that type), then L is set to 15.
/// If the representation is less than 14 bytes long, then L is set to the length,
/// and the length field is omitted.
/// If the representation is at least 14 bytes long, then L is set to 14,
/// and the length field is set to the representation length, encoded as a VarUInt field.
///
/// ## Illegal Type Descriptors
///
/// ```text
/// T    L                  Reason
/// 1    [3-14]             For bool values, L is used to encode the value,
///                         and may be 0 (false), 1 (true), or 15 (null.bool).
/// 3    [0]                The int 0 is always stored with type code 2.
/// 4    [1-3],[5-7],[9-14] Only 32-bit and 64-bit IEEE-754 values are supported.
/// 6    [0-1]              A VarInt offset and VarUInt year are required.
/// 14   [0]*,[1-2],[15]    Annotation wrappers must have one annot_length field, at least one annot
///                         field, and exactly one value field.
///                         *0xE0 is only legal as the first octet of a BVM.
/// 15   [0-15]             The type code 15 is illegal in Ion 1.0 data.
/// ```
///
/// # Panics
///
/// While TypeCode itself obviously does not have any mechanism to originate a panic, other code
/// depends via the FromPrimitive derivation on the fact that there are 16 variants of this enum.
#[derive(Clone, Debug, PartialEq, Eq, FromPrimitive, Copy)]
pub enum TypeCode {
    Null = 0,
    Bool = 1,
    PosInt = 2,
    NegInt = 3,
    Float = 4,
    Decimal = 5,
    Timestamp = 6,
    Symbol = 7,
    String = 8,
    Clob = 9,
    Blob = 10,
    List = 11,
    Sexp = 12,
    Struct = 13,
    Annotation = 14,
    Reserved = 15,
}

/// The possible values of the length field of a Typed Value
///
/// # Panics
///
/// While LengthCode itself obviously does not have any mechanism to originate a panic, other code
/// depends via the FromPrimitive derivation on the fact that there are 16 variants of this enum.
#[derive(Clone, Debug, PartialEq, Eq, FromPrimitive, Copy)]
pub enum LengthCode {
    L0 = 0,
    L1 = 1,
    L2 = 2,
    L3 = 3,
    L4 = 4,
    L5 = 5,
    L6 = 6,
    L7 = 7,
    L8 = 8,
    L9 = 9,
    L10 = 10,
    L11 = 11,
    L12 = 12,
    L13 = 13,
    L14 = 14,
    L15 = 15,
}

/// The Ion data model types surfaced to applications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IonType {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Timestamp,
    Symbol,
    String,
    Clob,
    Blob,
    List,
    Sexp,
    Struct,
}

impl IonType {
    pub fn is_container(self) -> bool {
        matches!(self, IonType::List | IonType::Sexp | IonType::Struct)
    }

    pub fn name(self) -> &'static str {
        match self {
            IonType::Null => "null",
            IonType::Bool => "bool",
            IonType::Int => "int",
            IonType::Float => "float",
            IonType::Decimal => "decimal",
            IonType::Timestamp => "timestamp",
            IonType::Symbol => "symbol",
            IonType::String => "string",
            IonType::Clob => "clob",
            IonType::Blob => "blob",
            IonType::List => "list",
            IonType::Sexp => "sexp",
            IonType::Struct => "struct",
        }
    }
}

/// Everything the cursor needs to know about one type descriptor octet.
///
/// Computed once per octet value into a 256-entry table, so recognizing a header is a single
/// lookup followed by (at most) one VarUInt length read.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TypeDescriptor {
    pub byte: u8,
    pub type_code: TypeCode,
    pub length_code: LengthCode,
    /// `None` for NOP padding, annotation wrappers and illegal descriptors.
    pub ion_type: Option<IonType>,
    pub is_null: bool,
    pub is_nop_pad: bool,
    pub is_valid: bool,
    /// True if a VarUInt length subfield follows the descriptor.
    pub variable_length: bool,
    /// Representation length when `variable_length` is false.
    pub inline_length: usize,
}

impl TypeDescriptor {
    pub fn from_byte(byte: u8) -> TypeDescriptor {
        TYPE_DESCRIPTORS[byte as usize]
    }

    pub fn is_annotation_wrapper(&self) -> bool {
        self.type_code == TypeCode::Annotation && self.is_valid
    }

    pub fn is_container(&self) -> bool {
        self.ion_type.map_or(false, IonType::is_container)
    }

    /// The error describing why this descriptor is illegal, or `Ok` if it is legal.
    pub fn check(&self) -> Result<(), BinaryFormatError> {
        if self.is_valid {
            return Ok(());
        }
        let length = self.length_code as u8;
        Err(match self.type_code {
            TypeCode::Bool => BinaryFormatError::BoolValue(length),
            TypeCode::NegInt => BinaryFormatError::NegativeZero,
            TypeCode::Float => BinaryFormatError::FloatLength(length),
            TypeCode::Timestamp => BinaryFormatError::TimestampLength(length),
            TypeCode::Annotation => BinaryFormatError::AnnotationLength(length),
            TypeCode::Reserved => BinaryFormatError::ReservedTypeCode,
            _ => BinaryFormatError::TypeDescriptor(self.byte),
        })
    }

    fn compute(byte: u8) -> TypeDescriptor {
        // Both casts are exhaustive over a nibble.
        let type_code = TypeCode::from_u8(byte >> 4).unwrap_or(TypeCode::Reserved);
        let length_code = LengthCode::from_u8(byte & 0x0F).unwrap_or(LengthCode::L15);
        let l = length_code as u8;

        let ion_type = match type_code {
            TypeCode::Null if l == 15 => Some(IonType::Null),
            TypeCode::Null => None,
            TypeCode::Bool => Some(IonType::Bool),
            TypeCode::PosInt | TypeCode::NegInt => Some(IonType::Int),
            TypeCode::Float => Some(IonType::Float),
            TypeCode::Decimal => Some(IonType::Decimal),
            TypeCode::Timestamp => Some(IonType::Timestamp),
            TypeCode::Symbol => Some(IonType::Symbol),
            TypeCode::String => Some(IonType::String),
            TypeCode::Clob => Some(IonType::Clob),
            TypeCode::Blob => Some(IonType::Blob),
            TypeCode::List => Some(IonType::List),
            TypeCode::Sexp => Some(IonType::Sexp),
            TypeCode::Struct => Some(IonType::Struct),
            TypeCode::Annotation | TypeCode::Reserved => None,
        };

        let is_valid = match type_code {
            TypeCode::Bool => matches!(l, 0 | 1 | 15),
            TypeCode::NegInt => l != 0,
            TypeCode::Float => matches!(l, 0 | 4 | 8 | 15),
            TypeCode::Timestamp => l >= 2,
            // 0xE0 is handled separately as the start of a binary version marker.
            TypeCode::Annotation => (3..=14).contains(&l),
            TypeCode::Reserved => false,
            _ => true,
        };

        let is_null = l == 15 && type_code != TypeCode::Annotation;
        let is_nop_pad = type_code == TypeCode::Null && l != 15;

        let (variable_length, inline_length) = match (type_code, l) {
            (_, 15) => (false, 0),
            // bools store their value in the length code and have no representation
            (TypeCode::Bool, _) => (false, 0),
            // L == 1 marks a struct with sorted field names, which always carries a length field
            (TypeCode::Struct, 1) => (true, 0),
            (_, 14) => (true, 0),
            (_, l) => (false, l as usize),
        };

        TypeDescriptor {
            byte,
            type_code,
            length_code,
            ion_type,
            is_null,
            is_nop_pad,
            is_valid,
            variable_length,
            inline_length,
        }
    }
}

lazy_static! {
    static ref TYPE_DESCRIPTORS: Vec<TypeDescriptor> =
        (0..=255u8).map(TypeDescriptor::compute).collect();
}
