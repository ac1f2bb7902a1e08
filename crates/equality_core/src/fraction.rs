//! Exact rational arithmetic for term values, coefficients and weights.
//!
//! Every value is kept in lowest terms with a positive denominator, so two
//! fractions are equal exactly when their fields are equal.

use crate::error::{EqualityError, Result};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// An immutable fraction in lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFraction", into = "RawFraction")]
pub struct ReducedFraction {
    numerator: i64,
    denominator: i64,
}

/// Wire form. Deserialization goes through `ReducedFraction::new` so a
/// snapshot can never smuggle in an unreduced value or a zero denominator.
#[derive(Serialize, Deserialize)]
struct RawFraction {
    numerator: i64,
    denominator: i64,
}

impl TryFrom<RawFraction> for ReducedFraction {
    type Error = EqualityError;

    fn try_from(raw: RawFraction) -> Result<Self> {
        ReducedFraction::new(raw.numerator, raw.denominator)
    }
}

impl From<ReducedFraction> for RawFraction {
    fn from(value: ReducedFraction) -> Self {
        RawFraction {
            numerator: value.numerator,
            denominator: value.denominator,
        }
    }
}

impl ReducedFraction {
    /// Creates and reduces a fraction.
    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        Self::from_wide(numerator as i128, denominator as i128)
    }

    pub const fn with_integer(value: i64) -> Self {
        Self {
            numerator: value,
            denominator: 1,
        }
    }

    /// Reduces a wide intermediate and narrows it back to `i64`. The
    /// numerator never ends up as `i64::MIN`, so negation cannot overflow.
    fn from_wide(numerator: i128, denominator: i128) -> Result<Self> {
        if denominator == 0 {
            return Err(EqualityError::ZeroDenominator);
        }
        let (mut numerator, mut denominator) = (numerator, denominator);
        if denominator < 0 {
            numerator = -numerator;
            denominator = -denominator;
        }
        let divisor = gcd_i128(numerator, denominator);
        let narrow = |value: i128| {
            i64::try_from(value)
                .ok()
                .filter(|v| *v != i64::MIN)
                .ok_or(EqualityError::Overflow)
        };
        Ok(Self {
            numerator: narrow(numerator / divisor)?,
            denominator: narrow(denominator / divisor)?,
        })
    }

    pub const fn numerator(self) -> i64 {
        self.numerator
    }

    /// Always > 0.
    pub const fn denominator(self) -> i64 {
        self.denominator
    }

    pub const fn is_integer(self) -> bool {
        self.denominator == 1
    }

    /// -1, 0 or 1.
    pub fn sign(self) -> i32 {
        self.numerator.signum() as i32
    }

    pub fn to_decimal(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub fn plus(self, other: Self) -> Result<Self> {
        let (n1, d1) = self.wide();
        let (n2, d2) = other.wide();
        let numerator = (n1 * d2)
            .checked_add(n2 * d1)
            .ok_or(EqualityError::Overflow)?;
        Self::from_wide(numerator, d1 * d2)
    }

    pub fn minus(self, other: Self) -> Result<Self> {
        let (n1, d1) = self.wide();
        let (n2, d2) = other.wide();
        let numerator = (n1 * d2)
            .checked_sub(n2 * d1)
            .ok_or(EqualityError::Overflow)?;
        Self::from_wide(numerator, d1 * d2)
    }

    pub fn times(self, other: Self) -> Result<Self> {
        let (n1, d1) = self.wide();
        let (n2, d2) = other.wide();
        Self::from_wide(n1 * n2, d1 * d2)
    }

    pub fn divided_by(self, other: Self) -> Result<Self> {
        if other.is_zero() {
            return Err(EqualityError::DivideByZero);
        }
        let (n1, d1) = self.wide();
        let (n2, d2) = other.wide();
        Self::from_wide(n1 * d2, d1 * n2)
    }

    pub fn negated(self) -> Result<Self> {
        let (n, d) = self.wide();
        Self::from_wide(-n, d)
    }

    pub fn plus_integer(self, value: i64) -> Result<Self> {
        self.plus(Self::with_integer(value))
    }

    pub fn minus_integer(self, value: i64) -> Result<Self> {
        self.minus(Self::with_integer(value))
    }

    pub fn times_integer(self, value: i64) -> Result<Self> {
        self.times(Self::with_integer(value))
    }

    pub fn divided_by_integer(self, value: i64) -> Result<Self> {
        self.divided_by(Self::with_integer(value))
    }

    pub fn abs(self) -> Self {
        Self {
            numerator: self.numerator.abs(),
            denominator: self.denominator,
        }
    }

    fn wide(self) -> (i128, i128) {
        (self.numerator as i128, self.denominator as i128)
    }
}

fn gcd_i128(left: i128, right: i128) -> i128 {
    let mut left = left.abs();
    let mut right = right.abs();
    while right != 0 {
        let rem = left % right;
        left = right;
        right = rem;
    }
    left.max(1)
}

impl Default for ReducedFraction {
    fn default() -> Self {
        Self::zero()
    }
}

impl Zero for ReducedFraction {
    fn zero() -> Self {
        Self::with_integer(0)
    }

    fn is_zero(&self) -> bool {
        self.numerator == 0
    }
}

impl One for ReducedFraction {
    fn one() -> Self {
        Self::with_integer(1)
    }
}

// The operators panic on overflow, as the integer operators do. Model code
// goes through the fallible methods above.

impl Add for ReducedFraction {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.plus(rhs)
            .unwrap_or_else(|err| panic!("{self} + {rhs}: {err}"))
    }
}

impl Sub for ReducedFraction {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.minus(rhs)
            .unwrap_or_else(|err| panic!("{self} - {rhs}: {err}"))
    }
}

impl Mul for ReducedFraction {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.times(rhs)
            .unwrap_or_else(|err| panic!("{self} * {rhs}: {err}"))
    }
}

impl Neg for ReducedFraction {
    type Output = Self;

    fn neg(self) -> Self {
        self.negated()
            .unwrap_or_else(|err| panic!("-({self}): {err}"))
    }
}

impl From<i64> for ReducedFraction {
    fn from(value: i64) -> Self {
        Self::with_integer(value)
    }
}

impl PartialOrd for ReducedFraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReducedFraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let (n1, d1) = self.wide();
        let (n2, d2) = other.wide();
        (n1 * d2).cmp(&(n2 * d1))
    }
}

impl fmt::Display for ReducedFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frac(numerator: i64, denominator: i64) -> ReducedFraction {
        ReducedFraction::new(numerator, denominator).expect("valid fraction")
    }

    #[test]
    fn new_reduces_and_normalizes_sign() {
        let value = frac(6, -8);
        assert_eq!(value.numerator(), -3);
        assert_eq!(value.denominator(), 4);

        let zero = frac(0, -5);
        assert_eq!(zero.numerator(), 0);
        assert_eq!(zero.denominator(), 1);
    }

    #[test]
    fn new_rejects_zero_denominator() {
        assert_eq!(
            ReducedFraction::new(1, 0),
            Err(EqualityError::ZeroDenominator)
        );
    }

    #[test]
    fn arithmetic_stays_reduced() {
        let half = frac(1, 2);
        let third = frac(1, 3);
        assert_eq!(half.plus(third).unwrap(), frac(5, 6));
        assert_eq!(half.minus(third).unwrap(), frac(1, 6));
        assert_eq!(half.times(third).unwrap(), frac(1, 6));
        assert_eq!(half.divided_by(third).expect("nonzero divisor"), frac(3, 2));
        assert_eq!(frac(2, 3).times_integer(3).unwrap(), ReducedFraction::with_integer(2));
        assert_eq!(
            ReducedFraction::with_integer(3)
                .divided_by_integer(-6)
                .expect("nonzero divisor"),
            frac(-1, 2)
        );
        assert_eq!(frac(1, 4).plus_integer(1).unwrap(), frac(5, 4));
        assert_eq!(frac(1, 4).minus_integer(1).unwrap(), frac(-3, 4));
        assert_eq!(half + third, frac(5, 6));
        assert_eq!(-half, frac(-1, 2));
    }

    #[test]
    fn results_outside_i64_overflow() {
        let big = ReducedFraction::with_integer(10i64.pow(18));
        assert_eq!(big.times_integer(10), Err(EqualityError::Overflow));
        assert_eq!(
            ReducedFraction::with_integer(i64::MAX).plus_integer(1),
            Err(EqualityError::Overflow)
        );
        let tiny = frac(1, 10i64.pow(18));
        assert_eq!(tiny.divided_by_integer(10), Err(EqualityError::Overflow));
        assert_eq!(tiny.divided_by_integer(-2), Ok(frac(-1, 2 * 10i64.pow(18))));
        assert_eq!(ReducedFraction::new(i64::MIN, 1), Err(EqualityError::Overflow));
        // the reduced value fits even though the intermediate does not
        assert_eq!(big.times(frac(1, 10i64.pow(18))), Ok(ReducedFraction::one()));
    }

    #[test]
    #[should_panic]
    fn operators_panic_on_overflow() {
        let _ = ReducedFraction::with_integer(i64::MAX) + ReducedFraction::one();
    }

    #[test]
    fn divide_by_zero_is_an_error() {
        assert_eq!(
            frac(1, 2).divided_by_integer(0),
            Err(EqualityError::DivideByZero)
        );
    }

    #[test]
    fn sign_and_ordering() {
        assert_eq!(frac(-1, 3).sign(), -1);
        assert_eq!(ReducedFraction::zero().sign(), 0);
        assert_eq!(frac(7, 2).sign(), 1);
        assert!(frac(1, 3) < frac(1, 2));
        assert!(frac(-1, 2) < frac(-1, 3));
        assert_eq!(frac(-7, 2).abs(), frac(7, 2));
    }

    #[test]
    fn display_omits_unit_denominator() {
        assert_eq!(frac(4, 2).to_string(), "2");
        assert_eq!(frac(-2, 6).to_string(), "-1/3");
    }

    #[test]
    fn deserialization_revalidates() {
        let value: ReducedFraction =
            serde_json::from_str(r#"{"numerator":4,"denominator":-6}"#).expect("parse");
        assert_eq!(value, frac(-2, 3));
        let bad = serde_json::from_str::<ReducedFraction>(r#"{"numerator":1,"denominator":0}"#);
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn fraction_is_always_reduced(numerator in -10_000i64..10_000, denominator in -10_000i64..10_000) {
            prop_assume!(denominator != 0);
            let value = frac(numerator, denominator);
            prop_assert!(value.denominator() > 0);
            prop_assert_eq!(gcd_i128(value.numerator() as i128, value.denominator() as i128), 1);
            let again = frac(value.numerator(), value.denominator());
            prop_assert_eq!(again, value);
        }

        #[test]
        fn plus_then_minus_is_identity(a in -500i64..500, b in 1i64..500, c in -500i64..500, d in 1i64..500) {
            let left = frac(a, b);
            let right = frac(c, d);
            prop_assert_eq!(left.plus(right).and_then(|sum| sum.minus(right)), Ok(left));
        }
    }
}
