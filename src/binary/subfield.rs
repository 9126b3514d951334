use std::iter;

use crate::error::BinaryFormatError;
use bit_vec::BitVec;
use nom::error::{ErrorKind, ParseError};
use nom::{
    bytes::streaming::{take, take_while},
    Err, IResult,
};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::identities::Zero;
use num_traits::ToPrimitive;

/// Documentation draws extensively on http://amzn.github.io/ion-docs/docs/binary.html.
///
/// Every parser in this module is a nom *streaming* parser: running out of input is reported as
/// `Err::Incomplete` rather than as an error, which is what lets the cursor stop in the middle of
/// a header and resume once more bytes have arrived.

/// ### UInt and Int Fields
///
/// ```text
///             7                       0
///            +-------------------------+
/// UInt field |          bits           |
///            +-------------------------+
///            :          bits           :
///            +=========================+
///
///              7  6                   0
///            +---+---------------------+
/// Int field  |   |      bits           |
///            +---+---------------------+
///              ^
///              +--sign
/// ```
///
/// UInts are sequences of octets, interpreted as big-endian. Ints are sign-and-magnitude big
/// endian integers, with the sign on the highest-order bit of the first octet.
pub fn parse_int(bytes: &[u8]) -> BigInt {
    let sign = match bytes.first() {
        Some(v) if *v > 0b0111_1111 => Sign::Minus,
        Some(_) => Sign::Plus,
        None => return BigInt::zero(),
    };

    if sign == Sign::Minus {
        let mut bytes = Vec::from(bytes);
        bytes[0] ^= 0b1000_0000; // clear the high bit to get the magnitude
        BigInt::from_biguint(sign, BigUint::from_bytes_be(&*bytes))
    } else {
        BigInt::from_biguint(sign, BigUint::from_bytes_be(bytes))
    }
}

pub fn parse_uint(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Magnitude of a UInt field, if it fits in a u64.
pub fn parse_uint_as_u64(bytes: &[u8]) -> Option<u64> {
    let significant = match bytes.iter().position(|b| *b != 0) {
        Some(first) => &bytes[first..],
        None => return Some(0),
    };
    if significant.len() > 8 {
        return None;
    }
    Some(
        significant
            .iter()
            .fold(0u64, |value, byte| (value << 8) | u64::from(*byte)),
    )
}

/// ### VarUInt and VarInt Fields
///
/// ```text
///                 7  6                   0       n+7 n+6                 n
///               +===+=====================+     +---+---------------------+
/// VarUInt field : 0 :         bits        :  …  | 1 |         bits        |
///               +===+=====================+     +---+---------------------+
/// ```
///
/// The high-order bit of the last octet is one, indicating the end of the sequence.
/// All other high-order bits must be zero. VarInts additionally carry a sign in bit 0x40 of
/// their first octet.
///
/// Lengths, symbol IDs and annotation lengths are VarUInts that must fit in a usize.
pub fn take_var_uint_as_usize(i: &[u8]) -> IResult<&[u8], usize> {
    let (rest, sequence) = take_while(high_bit_unset)(i)?;
    let (rest, terminator) = take(1usize)(rest)?;
    let mut value: usize = 0;
    for byte in sequence.iter().chain(iter::once(&terminator[0])) {
        if value > (usize::MAX >> 7) {
            return Err(Err::Failure(ParseError::from_error_kind(
                i,
                ErrorKind::TooLarge,
            )));
        }
        value = (value << 7) | usize::from(byte & 0b0111_1111);
    }
    Ok((rest, value))
}

pub fn take_var_int(i: &[u8]) -> IResult<&[u8], BigInt> {
    let (rest, sequence) = take_while(high_bit_unset)(i)?;
    let (rest, terminator) = take(1usize)(rest)?;
    Ok((rest, parse_var_int(sequence, terminator[0])))
}

// There are scenarios (ex. timestamp offsets and exponents) where allowing a VarInt that cannot
// fit in i64 is unreasonable. This should not pose an issue for non-pathological use cases.
pub fn take_var_int_as_i64(i: &[u8]) -> IResult<&[u8], i64> {
    let (rest, value) = take_var_int(i)?;
    match value.to_i64() {
        Some(value) => Ok((rest, value)),
        None => Err(Err::Failure(ParseError::from_error_kind(
            i,
            ErrorKind::TooLarge,
        ))),
    }
}

pub fn parse_var_int(sequence: &[u8], terminator: u8) -> BigInt {
    let sign = match sequence.first() {
        // we know that no byte in the sequence has the high bit set
        Some(byte) if *byte > 0b0011_1111 => Sign::Minus,
        Some(_) => Sign::Plus,
        // we know that the terminator byte has the high bit set
        None if terminator > 0b1011_1111 => Sign::Minus,
        None => Sign::Plus,
    };

    let mut bits = payload_bits(sequence, terminator);
    // clear the sign bit in the first byte
    let leading_bits = bits.len() - 7 * (sequence.len() + 1);
    bits.set(leading_bits, false);

    BigInt::from_biguint(sign, BigUint::from_bytes_be(&*bits.to_bytes()))
}

/// Collects the 7 payload bits of every octet, left-padded with zeroes to a whole number of octets.
fn payload_bits(sequence: &[u8], terminator: u8) -> BitVec {
    // total number of payload bits in the field
    let payload_bits = 7 * (sequence.len() + 1);

    // round payload_bits up to the nearest multiple of 8
    let bit_capacity = (payload_bits + 8 - 1) & (usize::max_value() << 3);

    let mut bits = BitVec::with_capacity(bit_capacity);

    // zero the extra leading bits
    for _ in 0..bit_capacity - payload_bits {
        bits.push(false);
    }

    for byte in sequence.iter().chain(iter::once(&terminator)) {
        for shift in (0..7).rev() {
            bits.push((byte >> shift) & 1 == 1);
        }
    }

    bits
}

fn high_bit_unset(byte: u8) -> bool {
    byte < 0b1000_0000
}

/// Reads a VarUInt at the head of `bytes` for the cursor.
///
/// `Ok(None)` means the field is not yet completely buffered; `Ok(Some((value, length)))` carries
/// the decoded value and the number of octets it occupied.
pub(crate) fn var_uint_at(bytes: &[u8]) -> Result<Option<(usize, usize)>, BinaryFormatError> {
    match take_var_uint_as_usize(bytes) {
        Ok((rest, value)) => Ok(Some((value, bytes.len() - rest.len()))),
        Err(Err::Incomplete(_)) => Ok(None),
        Err(_) => Err(BinaryFormatError::VarFieldOverflow(usize::BITS)),
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use hex::decode;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Examples from tests/ion-tests/iontestdata/good/subfieldInt.ion
    #[test]
    fn test_subfieldInt() {
        // 1 byte, 7 bits
        let bytes: &[u8] = &decode("7f").unwrap();
        assert_eq!(parse_int(bytes), BigInt::from(127));

        // 4 bytes, 31 bits
        let bytes: &[u8] = &decode("7fffffff").unwrap();
        assert_eq!(parse_int(bytes), BigInt::from(2_147_483_647));

        // 8 bytes, 63 bits
        let bytes: &[u8] = &decode("7fffffffffffffff").unwrap();
        assert_eq!(parse_int(bytes), BigInt::from(9_223_372_036_854_775_807i64));

        // 9 bytes, 64 bits
        let bytes: &[u8] = &decode("00ffffffffffffffff").unwrap();
        assert_eq!(
            parse_int(bytes),
            BigInt::from(18_446_744_073_709_551_615i128)
        );

        // negative, 2 bytes
        let bytes: &[u8] = &decode("ffff").unwrap();
        assert_eq!(parse_int(bytes), BigInt::from(-32767));
    }

    /// Examples from tests/ion-tests/iontestdata/good/subfieldUint.ion
    #[test]
    fn test_subfieldUint() {
        let bytes: &[u8] = &decode("ff").unwrap();
        assert_eq!(parse_uint(bytes), BigUint::from(255u32));

        let bytes: &[u8] = &decode("ffffffff").unwrap();
        assert_eq!(parse_uint(bytes), BigUint::from(4_294_967_295u32));

        let bytes: &[u8] = &decode("ffffffffffffffffffff").unwrap();
        assert_eq!(
            parse_uint(bytes),
            BigUint::from(1_208_925_819_614_629_174_706_175u128)
        );
    }

    #[test]
    fn uint_as_u64() {
        assert_eq!(parse_uint_as_u64(&[]), Some(0));
        assert_eq!(parse_uint_as_u64(&decode("00ff").unwrap()), Some(255));
        assert_eq!(
            parse_uint_as_u64(&decode("00ffffffffffffffff").unwrap()),
            Some(u64::MAX)
        );
        assert_eq!(
            parse_uint_as_u64(&decode("01ffffffffffffffff").unwrap()),
            None
        );
    }

    /// Examples from tests/ion-tests/iontestdata/good/subfieldVarInt.ion
    #[test]
    fn test_subfieldVarInt() {
        // 1 byte, 6 bits
        let bytes = decode("bf").unwrap();
        let (rest, varint) = take_var_int(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(varint, BigInt::from(63));

        // 2 bytes, 13 bits
        let (_, varint) = take_var_int(&decode("3fff").unwrap()).unwrap();
        assert_eq!(varint, BigInt::from(8191));

        // 5 bytes, 31 bits
        let (_, varint) = take_var_int(&decode("077f7f7fff").unwrap()).unwrap();
        assert_eq!(varint, BigInt::from(2_147_483_647));

        // negative single byte
        let (_, varint) = take_var_int_as_i64(&decode("c1").unwrap()).unwrap();
        assert_eq!(varint, -1);
    }

    /// Examples from
    /// tests/ion-tests/iontestdata/good/subfieldVarUint.ion
    /// tests/ion-tests/iontestdata/good/subfieldVarUint15bit.ion
    /// tests/ion-tests/iontestdata/good/subfieldVarUint16bit.ion
    /// tests/ion-tests/iontestdata/good/subfieldVarUint32bit.ion
    #[test]
    fn test_subfieldVarUint() {
        let cases = [
            ("ff", 127usize),
            ("7fff", 16383),
            ("017fff", 32767),
            ("037fff", 65535),
            ("7f7fff", 2_097_151),
            ("7f7f7fff", 268_435_455),
            ("077f7f7fff", 2_147_483_647),
        ];
        for (hex, expected) in cases.iter() {
            let bytes = decode(hex).unwrap();
            let (rest, value) = take_var_uint_as_usize(&bytes).unwrap();
            assert!(rest.is_empty());
            assert_eq!(value, *expected);
        }
    }

    #[test]
    fn var_uint_incomplete_is_not_an_error() {
        assert_eq!(var_uint_at(&[]), Ok(None));
        assert_eq!(var_uint_at(&[0x01, 0x7f]), Ok(None));
        assert_eq!(var_uint_at(&[0x01, 0x7f, 0xff, 0x00]), Ok(Some((32767, 3))));
    }

    #[test]
    fn var_uint_overflow() {
        let mut bytes = vec![0x7f; 12];
        bytes.push(0xff);
        assert_eq!(
            var_uint_at(&bytes),
            Err(BinaryFormatError::VarFieldOverflow(usize::BITS))
        );
    }
}
