use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

// decimal - Decimal-encoded real numbers of arbitrary precision
// Reference http://speleotrove.com/decimal/decarith.html
//
// The value is coefficient * 10 ^ exponent. Precision is significant: 1.0 (10d-1) and 1.00
// (100d-2) are different decimals, so equality compares coefficient and exponent separately.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    pub coefficient: BigInt,
    pub exponent: i64,
    /// A coefficient of zero with the sign bit set. Negative zero is a distinct Ion decimal.
    pub negative_zero: bool,
}

impl Decimal {
    pub fn new(coefficient: impl Into<BigInt>, exponent: i64) -> Decimal {
        Decimal {
            coefficient: coefficient.into(),
            exponent,
            negative_zero: false,
        }
    }

    pub fn negative_zero(exponent: i64) -> Decimal {
        Decimal {
            coefficient: BigInt::zero(),
            exponent,
            negative_zero: true,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.coefficient.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.negative_zero || self.coefficient.is_negative()
    }

    /// The value as an `f64`, rounding as necessary.
    pub fn to_f64(&self) -> f64 {
        if self.negative_zero {
            return -0.0;
        }
        let coefficient = self.coefficient.to_f64().unwrap_or(f64::NAN);
        let exponent = self
            .exponent
            .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        coefficient * 10f64.powi(exponent)
    }
}
