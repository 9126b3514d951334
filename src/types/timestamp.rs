use num_bigint::BigUint;

// timestamp - Date/time/timezone moments of arbitrary precision
// Mostly ISO 8601
//
// Ion follows the "Unknown Local Offset Convention" of RFC3339:
// > If the time in UTC is known, but the offset to local time is unknown, this can be
// > represented with an offset of "-00:00". This differs semantically from an offset of "Z" or
// > "+00:00", which imply that UTC is the preferred reference point for the specified time.
//
// Local-time offsets are required on timestamps with time and are not allowed on date values.
// Values that are precise only to the year, month, or date are assumed to be UTC values with
// unknown local offset.
//
// Zero and negative dates are not valid, so the earliest instant in time that can be
// represented as a timestamp is Jan 01, 0001. As per the W3C note, leap seconds cannot be
// represented.

/// The most precise component a timestamp carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    FractionalSecond,
}

/// A timestamp as encoded in binary Ion: every component is in UTC.
///
/// Components less precise than `precision` are always meaningful; more precise ones are zero
/// (or one, for month and day).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Minutes difference from UTC. `None` indicates an unknown local offset.
    pub offset: Option<i16>,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Fractional seconds, as coefficient * 10 ^ exponent.
    pub fraction_coefficient: BigUint,
    pub fraction_exponent: i32,
    pub precision: Precision,
}

impl Timestamp {
    pub fn with_year(year: u16) -> Timestamp {
        Timestamp {
            offset: None,
            year,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            fraction_coefficient: BigUint::default(),
            fraction_exponent: 0,
            precision: Precision::Year,
        }
    }

    pub fn with_month(self, month: u8) -> Timestamp {
        Timestamp {
            month,
            precision: Precision::Month,
            ..self
        }
    }

    pub fn with_day(self, day: u8) -> Timestamp {
        Timestamp {
            day,
            precision: Precision::Day,
            ..self
        }
    }

    pub fn with_hour_and_minute(self, hour: u8, minute: u8) -> Timestamp {
        Timestamp {
            hour,
            minute,
            precision: Precision::Minute,
            ..self
        }
    }

    pub fn with_second(self, second: u8) -> Timestamp {
        Timestamp {
            second,
            precision: Precision::Second,
            ..self
        }
    }

    pub fn with_fraction(self, coefficient: BigUint, exponent: i32) -> Timestamp {
        Timestamp {
            fraction_coefficient: coefficient,
            fraction_exponent: exponent,
            precision: Precision::FractionalSecond,
            ..self
        }
    }

    pub fn with_offset(self, offset: Option<i16>) -> Timestamp {
        Timestamp { offset, ..self }
    }
}
