//! Decoding of scalar representations. Every function here is handed the complete, buffered
//! representation of a non-null value.

use nom::number::complete::{be_f32, be_f64};
use nom::IResult;
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use crate::binary::subfield::{
    parse_int, parse_uint, parse_uint_as_u64, take_var_int_as_i64, take_var_uint_as_usize,
};
use crate::binary::{TypeCode, TypeDescriptor};
use crate::error::BinaryFormatError;
use crate::types::{Decimal, Timestamp};

fn complete<'a, T>(
    result: IResult<&'a [u8], T>,
    subfield: &'static str,
) -> Result<(&'a [u8], T), BinaryFormatError> {
    result.map_err(|_| BinaryFormatError::Subfield(subfield))
}

/// ### 1: bool
///
/// Bools store their value in the length code: 0 is false and 1 is true.
pub fn decode_bool(descriptor: &TypeDescriptor) -> Result<bool, BinaryFormatError> {
    match descriptor.length_code as u8 {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(BinaryFormatError::BoolValue(other)),
    }
}

/// ### 2 and 3: int
///
/// Values of type int are stored using two type codes: 2 for positive values and 3 for negative
/// values. Both codes use a UInt subfield to store the magnitude.
///
/// Zero is always stored as positive; negative zero is illegal.
pub fn decode_int(
    descriptor: &TypeDescriptor,
    representation: &[u8],
) -> Result<BigInt, BinaryFormatError> {
    let magnitude = parse_uint(representation);
    match descriptor.type_code {
        TypeCode::NegInt if magnitude.is_zero() => Err(BinaryFormatError::NegativeZero),
        TypeCode::NegInt => Ok(BigInt::from_biguint(Sign::Minus, magnitude)),
        _ => Ok(BigInt::from_biguint(Sign::Plus, magnitude)),
    }
}

/// ### 4: float
///
/// Floats are encoded as big endian octets of their IEEE 754 bit patterns. If L is 0 the value
/// is 0e0 and the representation is empty.
pub fn decode_float(representation: &[u8]) -> Result<f64, BinaryFormatError> {
    match representation.len() {
        0 => Ok(0e0),
        4 => complete(be_f32(representation), "float").map(|(_, value)| f64::from(value)),
        8 => complete(be_f64(representation), "float").map(|(_, value)| value),
        other => Err(BinaryFormatError::FloatLength(other as u8)),
    }
}

/// ### 5: decimal
///
/// ```text
///               +--------------------------+
///               |    exponent [VarInt]     |
///               +--------------------------+
///               |    coefficient [Int]     |
///               +--------------------------+
/// ```
///
/// The coefficient subfield is absent when the coefficient is (positive) zero. An empty
/// representation is 0d0.
pub fn decode_decimal(representation: &[u8]) -> Result<Decimal, BinaryFormatError> {
    if representation.is_empty() {
        return Ok(Decimal::new(0, 0));
    }
    let (coefficient, exponent) =
        complete(take_var_int_as_i64(representation), "decimal exponent")?;
    let value = parse_int(coefficient);
    if value.is_zero() && coefficient.first().map_or(false, |byte| byte & 0x80 != 0) {
        return Ok(Decimal::negative_zero(exponent));
    }
    Ok(Decimal::new(value, exponent))
}

fn component<'a, T>(
    representation: &'a [u8],
    name: &'static str,
    convert: impl Fn(usize) -> Option<T>,
) -> Result<(&'a [u8], T), BinaryFormatError> {
    let (rest, value) = complete(take_var_uint_as_usize(representation), name)?;
    match convert(value) {
        Some(value) => Ok((rest, value)),
        None => Err(BinaryFormatError::Timestamp(name)),
    }
}

fn in_range(range: std::ops::RangeInclusive<usize>) -> impl Fn(usize) -> Option<u8> {
    move |value| {
        if range.contains(&value) {
            Some(value as u8)
        } else {
            None
        }
    }
}

/// ### 6: timestamp
///
/// ```text
///                 +----------------------------+
///                 |      offset [VarInt]       |
///                 +----------------------------+
///                 |       year [VarUInt]       |
///                 +----------------------------+
///                 :       month [VarUInt]      :
///                 +============================+
///                 :         day [VarUInt]      :
///                 +============================+
///                 :        hour [VarUInt]      :
///                 +====                    ====+
///                 :      minute [VarUInt]      :
///                 +============================+
///                 :      second [VarUInt]      :
///                 +============================+
///                 : fraction_exponent [VarInt] :
///                 +============================+
///                 : fraction_coefficient [Int] :
///                 +============================+
/// ```
///
/// If a representation has a component of a certain precision, each of the less precise
/// components must also be present. Hour and minute form a single component.
///
/// An offset of negative zero is an unknown local offset. Fractions whose coefficient is zero and
/// exponent is greater than -1 are ignored.
pub fn decode_timestamp(representation: &[u8]) -> Result<Timestamp, BinaryFormatError> {
    let (rest, offset) = complete(take_var_int_as_i64(representation), "timestamp offset")?;
    let offset = if offset == 0 && representation[0] & 0x40 != 0 {
        None
    } else {
        Some(offset.to_i16().ok_or(BinaryFormatError::Timestamp("offset"))?)
    };

    let (rest, year) = component(rest, "year", |year| match year {
        1..=9999 => Some(year as u16),
        _ => None,
    })?;
    let timestamp = Timestamp::with_year(year).with_offset(offset);
    if rest.is_empty() {
        return Ok(timestamp);
    }

    let (rest, month) = component(rest, "month", in_range(1..=12))?;
    let timestamp = timestamp.with_month(month);
    if rest.is_empty() {
        return Ok(timestamp);
    }

    let (rest, day) = component(rest, "day", in_range(1..=31))?;
    let timestamp = timestamp.with_day(day);
    if rest.is_empty() {
        return Ok(timestamp);
    }

    let (rest, hour) = component(rest, "hour", in_range(0..=23))?;
    if rest.is_empty() {
        return Err(BinaryFormatError::Timestamp("hour without minute"));
    }
    let (rest, minute) = component(rest, "minute", in_range(0..=59))?;
    let timestamp = timestamp.with_hour_and_minute(hour, minute);
    if rest.is_empty() {
        return Ok(timestamp);
    }

    let (rest, second) = component(rest, "second", in_range(0..=59))?;
    let timestamp = timestamp.with_second(second);
    if rest.is_empty() {
        return Ok(timestamp);
    }

    let (rest, exponent) = complete(take_var_int_as_i64(rest), "fraction exponent")?;
    let exponent = exponent
        .to_i32()
        .ok_or(BinaryFormatError::Timestamp("fraction exponent"))?;
    // A missing coefficient defaults to zero.
    let coefficient = parse_int(rest);
    if coefficient.is_negative() {
        return Err(BinaryFormatError::Timestamp("negative fractional seconds"));
    }
    let coefficient = coefficient.magnitude().clone();
    if coefficient.is_zero() {
        if exponent > -1 {
            return Ok(timestamp);
        }
    } else if exponent >= 0 || coefficient.to_str_radix(10).len() as i64 > -i64::from(exponent) {
        return Err(BinaryFormatError::Timestamp("fractional seconds of one or more"));
    }
    Ok(timestamp.with_fraction(coefficient, exponent))
}

/// ### 7: symbol
///
/// The representation is a UInt symbol ID. If L is zero the symbol ID is zero.
pub fn decode_symbol_id(representation: &[u8]) -> Result<usize, BinaryFormatError> {
    parse_uint_as_u64(representation)
        .and_then(|sid| sid.to_usize())
        .ok_or(BinaryFormatError::VarFieldOverflow(usize::BITS))
}
