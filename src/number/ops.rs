use std::ops;

use num::rational::Ratio;
use num::Integer;

use super::{Number, Rational};
use crate::error::{SymError, SymResult};

/// Both operands of a binary operation, lifted to their common rank.
///
/// Operand order is preserved, so non-commutative operations never need to
/// swap anything after promotion.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Promoted {
    Integer(i64, i64),
    Rational(Rational, Rational),
    Real(f64, f64),
}

impl Promoted {
    pub(crate) fn lift(lhs: Number, rhs: Number) -> Self {
        match (lhs, rhs) {
            (Number::Real(a), b) => Promoted::Real(a, b.to_f64()),
            (a, Number::Real(b)) => Promoted::Real(a.to_f64(), b),
            (Number::Rational(a), Number::Rational(b)) => Promoted::Rational(a, b),
            (Number::Rational(a), b) => Promoted::Rational(a, Ratio::from_integer(b.truncated())),
            (a, Number::Rational(b)) => Promoted::Rational(Ratio::from_integer(a.truncated()), b),
            (a, b) => Promoted::Integer(a.truncated(), b.truncated()),
        }
    }
}

/// Reduces `numer / denom` and narrows it back to `i64`, `None` on overflow.
/// `denom` must not be zero.
fn exact(numer: i128, denom: i128) -> Option<Number> {
    let g = numer.gcd(&denom);
    let (mut numer, mut denom) = (numer / g, denom / g);
    if denom < 0 {
        numer = numer.checked_neg()?;
        denom = denom.checked_neg()?;
    }
    let numer = i64::try_from(numer).ok()?;
    let denom = i64::try_from(denom).ok()?;
    Some(if denom == 1 {
        Number::Integer(numer)
    } else {
        Number::Rational(Ratio::new_raw(numer, denom))
    })
}

fn wide(r: Rational) -> (i128, i128) {
    (i128::from(*r.numer()), i128::from(*r.denom()))
}

/// Applies an exact rational operation in `i128`, falling back to the real
/// operation if the result does not fit.
fn rational_op(
    a: Rational,
    b: Rational,
    exact_op: impl FnOnce((i128, i128), (i128, i128)) -> Option<(i128, i128)>,
    real_op: impl FnOnce(f64, f64) -> f64,
) -> Number {
    exact_op(wide(a), wide(b))
        .and_then(|(n, d)| exact(n, d))
        .unwrap_or_else(|| {
            Number::Real(real_op(
                Number::Rational(a).to_f64(),
                Number::Rational(b).to_f64(),
            ))
        })
}

impl ops::Add for Number {
    type Output = Number;

    fn add(self, rhs: Number) -> Number {
        match Promoted::lift(self, rhs) {
            Promoted::Integer(a, b) => a
                .checked_add(b)
                .map_or_else(|| Number::Real(a as f64 + b as f64), Number::Integer),
            Promoted::Rational(a, b) => rational_op(
                a,
                b,
                |(n1, d1), (n2, d2)| {
                    let n = n1.checked_mul(d2)?.checked_add(n2.checked_mul(d1)?)?;
                    Some((n, d1.checked_mul(d2)?))
                },
                |x, y| x + y,
            ),
            Promoted::Real(a, b) => Number::Real(a + b),
        }
    }
}

impl ops::Sub for Number {
    type Output = Number;

    fn sub(self, rhs: Number) -> Number {
        match Promoted::lift(self, rhs) {
            Promoted::Integer(a, b) => a
                .checked_sub(b)
                .map_or_else(|| Number::Real(a as f64 - b as f64), Number::Integer),
            Promoted::Rational(a, b) => rational_op(
                a,
                b,
                |(n1, d1), (n2, d2)| {
                    let n = n1.checked_mul(d2)?.checked_sub(n2.checked_mul(d1)?)?;
                    Some((n, d1.checked_mul(d2)?))
                },
                |x, y| x - y,
            ),
            Promoted::Real(a, b) => Number::Real(a - b),
        }
    }
}

impl ops::Mul for Number {
    type Output = Number;

    fn mul(self, rhs: Number) -> Number {
        match Promoted::lift(self, rhs) {
            Promoted::Integer(a, b) => a
                .checked_mul(b)
                .map_or_else(|| Number::Real(a as f64 * b as f64), Number::Integer),
            Promoted::Rational(a, b) => rational_op(
                a,
                b,
                |(n1, d1), (n2, d2)| Some((n1.checked_mul(n2)?, d1.checked_mul(d2)?)),
                |x, y| x * y,
            ),
            Promoted::Real(a, b) => Number::Real(a * b),
        }
    }
}

impl ops::Div for Number {
    type Output = SymResult<Number>;

    fn div(self, rhs: Number) -> Self::Output {
        if rhs.is_zero() {
            return Err(SymError::DivideByZero);
        }
        Ok(match Promoted::lift(self, rhs) {
            Promoted::Integer(a, b) => exact(i128::from(a), i128::from(b))
                .unwrap_or_else(|| Number::Real(a as f64 / b as f64)),
            Promoted::Rational(a, b) => rational_op(
                a,
                b,
                |(n1, d1), (n2, d2)| Some((n1.checked_mul(d2)?, d1.checked_mul(n2)?)),
                |x, y| x / y,
            ),
            Promoted::Real(a, b) => Number::Real(a / b),
        })
    }
}

impl ops::Rem for Number {
    type Output = SymResult<Number>;

    /// Truncated remainder, the result takes the sign of `self`.
    fn rem(self, rhs: Number) -> Self::Output {
        if rhs.is_zero() {
            return Err(SymError::DivideByZero);
        }
        Ok(match Promoted::lift(self, rhs) {
            // Only i64::MIN % -1 overflows and that remainder is 0.
            Promoted::Integer(a, b) => Number::Integer(a.checked_rem(b).unwrap_or(0)),
            Promoted::Rational(a, b) => rational_op(
                a,
                b,
                |(n1, d1), (n2, d2)| {
                    let lhs = n1.checked_mul(d2)?;
                    let rhs = n2.checked_mul(d1)?;
                    Some((lhs.checked_rem(rhs)?, d1.checked_mul(d2)?))
                },
                |x, y| x % y,
            ),
            Promoted::Real(a, b) => Number::Real(a % b),
        })
    }
}

impl ops::Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        Number::Integer(-1) * self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Rank;

    #[test]
    fn integer_division_kinds() {
        assert!(matches!(
            (Number::Integer(6) / Number::Integer(3)).unwrap(),
            Number::Integer(2)
        ));
        let third = (Number::Integer(2) / Number::Integer(6)).unwrap();
        assert_eq!(third.rank(), Rank::Rational);
        assert_eq!(third.to_string(), "1/3");
    }

    #[test]
    fn division_by_zero_everywhere() {
        for zero in [
            Number::Boolean(false),
            Number::Integer(0),
            Number::Real(0.0),
        ] {
            assert!(matches!(
                Number::Real(1.0) / zero,
                Err(SymError::DivideByZero)
            ));
            assert!(matches!(
                Number::Integer(1) % zero,
                Err(SymError::DivideByZero)
            ));
        }
    }

    #[test]
    fn rational_sum_demotes() {
        let half = Number::rational(1, 2).unwrap();
        assert!(matches!(half + half, Number::Integer(1)));
    }

    #[test]
    fn subtraction_keeps_operand_order() {
        let third = Number::rational(1, 3).unwrap();
        let diff = Number::Integer(1) - third;
        assert_eq!(diff.to_string(), "2/3");
        let diff = third - Number::Integer(1);
        assert_eq!(diff.to_string(), "-2/3");
        let quot = (Number::Integer(1) / Number::Real(4.0)).unwrap();
        assert_eq!(quot.to_f64(), 0.25);
    }

    #[test]
    fn booleans_promote_to_integers() {
        assert!(matches!(
            Number::Boolean(true) + Number::Boolean(true),
            Number::Integer(2)
        ));
    }

    #[test]
    fn overflow_promotes_to_real() {
        let sum = Number::Integer(i64::MAX) + Number::Integer(1);
        assert_eq!(sum.rank(), Rank::Real);
        let neg = -Number::Integer(i64::MIN);
        assert_eq!(neg.rank(), Rank::Real);
    }

    #[test]
    fn remainders() {
        assert!(matches!(
            (Number::Integer(-7) % Number::Integer(3)).unwrap(),
            Number::Integer(-1)
        ));
        let r = (Number::rational(7, 2).unwrap() % Number::Integer(1)).unwrap();
        assert_eq!(r.to_string(), "1/2");
        let r = (Number::Real(7.5) % Number::Integer(2)).unwrap();
        assert_eq!(r.to_f64(), 1.5);
    }
}
