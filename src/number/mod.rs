use std::cmp::Ordering;
use std::fmt;

use num::rational::Ratio;
use num_traits::{One, Signed, ToPrimitive, Zero};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use strum::EnumDiscriminants;

use crate::error::{SymError, SymResult};

mod ops;

pub(crate) use ops::Promoted;

pub type Rational = Ratio<i64>;

/// The numeric tower.
///
/// Kinds are ranked `Boolean < Integer < Rational < Real`, see [`Rank`].
/// Binary operations lift both operands to the higher rank first and the
/// result kind may differ from either operand (`Integer / Integer` can be a
/// `Rational`, a `Rational` sum can demote to an `Integer`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(Rank), derive(PartialOrd, Ord, Hash))]
pub enum Number {
    Boolean(bool),
    Integer(i64),
    Rational(Rational),
    Real(f64),
}

impl Number {
    /// Builds a rational in lowest terms with a positive denominator.
    ///
    /// The result keeps the `Rational` kind even if it is integral, only
    /// simplification demotes it.
    ///
    /// # Errors
    /// Fails with [`SymError::DivideByZero`] if `denom` is zero.
    pub fn rational(numer: i64, denom: i64) -> SymResult<Self> {
        if denom == 0 {
            return Err(SymError::DivideByZero);
        }
        let (numer, denom) = if denom < 0 {
            match (numer.checked_neg(), denom.checked_neg()) {
                (Some(n), Some(d)) => (n, d),
                _ => return Ok(Number::Real(numer as f64 / denom as f64)),
            }
        } else {
            (numer, denom)
        };
        Ok(Number::Rational(Ratio::new(numer, denom)))
    }

    /// Demotes an integral rational to an integer, leaves everything else.
    #[must_use]
    pub fn demoted(self) -> Self {
        match self {
            Number::Rational(r) if r.is_integer() => Number::Integer(r.to_integer()),
            other => other,
        }
    }

    #[must_use]
    pub fn rank(&self) -> Rank {
        Rank::from(self)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Number::Boolean(b) => !b,
            Number::Integer(i) => *i == 0,
            Number::Rational(r) => r.is_zero(),
            Number::Real(f) => *f == 0.0,
        }
    }

    #[must_use]
    pub fn is_one(&self) -> bool {
        match self {
            Number::Boolean(b) => *b,
            Number::Integer(i) => *i == 1,
            Number::Rational(r) => r.is_one(),
            Number::Real(f) => *f == 1.0,
        }
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        match self {
            Number::Boolean(_) => false,
            Number::Integer(i) => *i < 0,
            Number::Rational(r) => r.is_negative(),
            Number::Real(f) => *f < 0.0,
        }
    }

    /// True if the value has no fractional part.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        match self {
            Number::Boolean(_) | Number::Integer(_) => true,
            Number::Rational(r) => r.is_integer(),
            Number::Real(f) => f.is_finite() && f.fract() == 0.0,
        }
    }

    #[must_use]
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Number::Integer(i) => *i as f64,
            Number::Rational(r) => *r.numer() as f64 / *r.denom() as f64,
            Number::Real(f) => *f,
        }
    }

    /// The exact integer value.
    ///
    /// # Errors
    /// Fails with [`SymError::IncompatibleNumeric`] if the value is not an
    /// integer that fits into an `i64`.
    pub fn to_i64(&self) -> SymResult<i64> {
        match self {
            Number::Boolean(b) => Ok(i64::from(*b)),
            Number::Integer(i) => Ok(*i),
            Number::Rational(r) if r.is_integer() => Ok(r.to_integer()),
            Number::Real(f) if self.is_integral() => f
                .to_i64()
                .ok_or_else(|| SymError::IncompatibleNumeric(format!("{f} does not fit an i64"))),
            other => Err(SymError::IncompatibleNumeric(format!(
                "{other} is not an integer"
            ))),
        }
    }

    /// Value rounded towards zero. Only used once promotion has ruled out
    /// rationals and reals.
    #[expect(clippy::cast_possible_truncation)]
    pub(crate) fn truncated(self) -> i64 {
        match self {
            Number::Boolean(b) => i64::from(b),
            Number::Integer(i) => i,
            Number::Rational(r) => r.to_integer(),
            Number::Real(f) => f as i64,
        }
    }

    /// Total order across all kinds.
    ///
    /// Exact kinds compare by cross-multiplied numerators. An exact value
    /// against a real compares with the real's exact binary value, so the
    /// order stays transitive beyond 2^53. Reals compare as floats (`NaN`
    /// sorts last).
    #[must_use]
    pub fn compare_number(&self, other: &Number) -> Ordering {
        match (self, other) {
            (Number::Real(a), Number::Real(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            (Number::Real(a), exact) => exact.compare_with_real(*a).reverse(),
            (exact, Number::Real(b)) => exact.compare_with_real(*b),
            _ => match Promoted::lift(*self, *other) {
                Promoted::Integer(a, b) => a.cmp(&b),
                Promoted::Rational(a, b) => {
                    let lhs = i128::from(*a.numer()) * i128::from(*b.denom());
                    let rhs = i128::from(*b.numer()) * i128::from(*a.denom());
                    lhs.cmp(&rhs)
                }
                Promoted::Real(a, b) => OrderedFloat(a).cmp(&OrderedFloat(b)),
            },
        }
    }

    /// Exact value as `numer / denom` with `denom > 0`, `None` for reals.
    fn as_fraction(&self) -> Option<(i128, i128)> {
        match self {
            Number::Boolean(b) => Some((i128::from(*b), 1)),
            Number::Integer(i) => Some((i128::from(*i), 1)),
            Number::Rational(r) => Some((i128::from(*r.numer()), i128::from(*r.denom()))),
            Number::Real(_) => None,
        }
    }

    /// Compares an exact value with a real without rounding either side.
    #[expect(clippy::cast_possible_truncation)]
    fn compare_with_real(&self, real: f64) -> Ordering {
        let Some((numer, denom)) = self.as_fraction() else {
            return OrderedFloat(self.to_f64()).cmp(&OrderedFloat(real));
        };
        if real.is_nan() || real == f64::INFINITY {
            return Ordering::Less;
        }
        if real == f64::NEG_INFINITY {
            return Ordering::Greater;
        }
        // Exact values stay within i64, anything this large decides by sign.
        let floor = real.floor();
        if floor.abs() >= 2f64.powi(100) {
            return if real > 0.0 { Ordering::Less } else { Ordering::Greater };
        }
        let whole = numer.div_euclid(denom);
        let whole_order = whole.cmp(&(floor as i128));
        if whole_order.is_ne() {
            return whole_order;
        }
        compare_fractions(numer.rem_euclid(denom), denom, real - floor)
    }

    /// `self^exp` for an integer exponent.
    ///
    /// Exact kinds use binary exponentiation and stay exact until they
    /// overflow, reals go through `powf`.
    ///
    /// # Errors
    /// Fails with [`SymError::DivideByZero`] for a zero base and a negative
    /// exponent.
    pub fn pow_integer(self, exp: i64) -> SymResult<Number> {
        if let Number::Real(f) = self {
            return Ok(Number::Real(f.powf(exp as f64)));
        }
        let mut result = Number::Integer(1);
        let mut base = match self {
            Number::Boolean(b) => Number::Integer(i64::from(b)),
            other => other,
        };
        let mut remaining = exp.unsigned_abs();
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result * base;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base * base;
            }
        }
        if exp < 0 {
            Number::Integer(1) / result
        } else {
            Ok(result)
        }
    }
}

/// Compares `rem / denom` with `frac`, both in `[0, 1)`, one binary digit at
/// a time. Doubling and subtracting one are exact for `frac`, so the loop
/// ends once its finitely many digits are used up.
fn compare_fractions(mut rem: i128, denom: i128, mut frac: f64) -> Ordering {
    loop {
        if frac == 0.0 {
            return if rem == 0 { Ordering::Equal } else { Ordering::Greater };
        }
        if rem == 0 {
            return Ordering::Less;
        }
        rem *= 2;
        frac *= 2.0;
        let exact_digit = rem >= denom;
        let real_digit = frac >= 1.0;
        if exact_digit != real_digit {
            return exact_digit.cmp(&real_digit);
        }
        if exact_digit {
            rem -= denom;
            frac -= 1.0;
        }
    }
}

impl From<bool> for Number {
    fn from(value: bool) -> Self {
        Number::Boolean(value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Real(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Boolean(true) => write!(f, "True"),
            Number::Boolean(false) => write!(f, "False"),
            Number::Integer(i) => write!(f, "{i}"),
            Number::Rational(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Number::Real(x) => write!(f, "{x}"),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Boolean => write!(f, "Boolean"),
            Rank::Integer => write!(f, "Integer"),
            Rank::Rational => write!(f, "Rational"),
            Rank::Real => write!(f, "Real"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_is_reduced() {
        let Number::Rational(r) = Number::rational(6, -4).unwrap() else {
            panic!("expected a rational");
        };
        assert_eq!(*r.numer(), -3);
        assert_eq!(*r.denom(), 2);
    }

    #[test]
    fn rational_zero_denominator() {
        assert!(matches!(
            Number::rational(1, 0),
            Err(SymError::DivideByZero)
        ));
    }

    #[test]
    fn integral_rational_demotes() {
        let n = Number::rational(8, 4).unwrap();
        assert_eq!(n.rank(), Rank::Rational);
        assert!(matches!(n.demoted(), Number::Integer(2)));
    }

    #[test]
    fn cross_kind_order() {
        let half = Number::rational(1, 2).unwrap();
        assert_eq!(half.compare_number(&Number::Integer(1)), Ordering::Less);
        assert_eq!(half.compare_number(&Number::Real(0.5)), Ordering::Equal);
        assert_eq!(
            Number::Boolean(true).compare_number(&Number::Integer(1)),
            Ordering::Equal
        );
        assert_eq!(
            Number::Real(f64::NAN).compare_number(&Number::Real(f64::INFINITY)),
            Ordering::Greater
        );
    }

    #[test]
    fn exact_against_real_beyond_float_precision() {
        let big = 1i64 << 53;
        let real = Number::Real(big as f64);
        assert_eq!(Number::Integer(big).compare_number(&real), Ordering::Equal);
        assert_eq!(Number::Integer(big + 1).compare_number(&real), Ordering::Greater);
        assert_eq!(real.compare_number(&Number::Integer(big + 1)), Ordering::Less);
        assert_eq!(
            Number::rational(2 * big + 1, 2).unwrap().compare_number(&real),
            Ordering::Greater
        );
        let third = Number::rational(1, 3).unwrap();
        assert_eq!(third.compare_number(&Number::Real(1.0 / 3.0)), Ordering::Greater);
        assert_eq!(
            Number::Integer(i64::MAX).compare_number(&Number::Real(f64::INFINITY)),
            Ordering::Less
        );
        assert_eq!(
            Number::Integer(i64::MIN).compare_number(&Number::Real(-1e300)),
            Ordering::Greater
        );
    }

    #[test]
    fn mixed_kinds_sort_consistently() {
        let big = 1i64 << 53;
        let mut values = Vec::new();
        for k in 0..40 {
            values.push(Number::Integer(big + k - 20));
            values.push(Number::Real((big + 2 * k - 40) as f64));
        }
        values.sort_by(Number::compare_number);
        for pair in values.windows(2) {
            assert!(pair[0].compare_number(&pair[1]).is_le());
        }
        for a in &values {
            for b in &values {
                assert_eq!(a.compare_number(b), b.compare_number(a).reverse());
            }
        }
    }

    #[test]
    fn binary_exponentiation() {
        assert!(matches!(
            Number::Integer(2).pow_integer(10).unwrap(),
            Number::Integer(1024)
        ));
        let Number::Rational(r) = Number::Integer(2).pow_integer(-3).unwrap() else {
            panic!("expected a rational");
        };
        assert_eq!((*r.numer(), *r.denom()), (1, 8));
        assert!(matches!(
            Number::Integer(0).pow_integer(-1),
            Err(SymError::DivideByZero)
        ));
    }

    #[test]
    fn overflowing_power_turns_real() {
        let big = Number::Integer(10).pow_integer(30).unwrap();
        assert_eq!(big.rank(), Rank::Real);
        assert!((big.to_f64() - 1e30).abs() / 1e30 < 1e-12);
    }

    #[test]
    fn printed_form() {
        assert_eq!(Number::Boolean(true).to_string(), "True");
        assert_eq!(Number::rational(3, 4).unwrap().to_string(), "3/4");
        assert_eq!(Number::Real(2.5).to_string(), "2.5");
    }
}
