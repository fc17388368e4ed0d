//! Arithmetic on whole expressions.
//!
//! Two numbers fold through the numeric tower, anything else falls back to a
//! symbolic `Sum` or `Product`.

use crate::error::{SymError, SymResult};
use crate::expr::Expression;

fn numbers(a: &Expression, b: &Expression) -> Option<(crate::Number, crate::Number)> {
    Some((*a.as_number()?, *b.as_number()?))
}

#[must_use]
pub fn add(a: Expression, b: Expression) -> Expression {
    match numbers(&a, &b) {
        Some((x, y)) => Expression::number(x + y),
        None => Expression::sum([a, b]),
    }
}

/// `a - b`, symbolically `a + (-1)*b`.
#[must_use]
pub fn sub(a: Expression, b: Expression) -> Expression {
    match numbers(&a, &b) {
        Some((x, y)) => Expression::number(x - y),
        None => Expression::sum([a, neg(b)]),
    }
}

#[must_use]
pub fn mul(a: Expression, b: Expression) -> Expression {
    match numbers(&a, &b) {
        Some((x, y)) => Expression::number(x * y),
        None => Expression::product([a, b]),
    }
}

/// `a / b`, symbolically `a * b^-1`.
///
/// # Errors
/// Fails with [`SymError::DivideByZero`] if `b` is a numeric zero.
pub fn div(a: Expression, b: Expression) -> SymResult<Expression> {
    if b.is_zero() {
        return Err(SymError::DivideByZero);
    }
    match numbers(&a, &b) {
        Some((x, y)) => Ok(Expression::number((x / y)?)),
        None => Ok(Expression::product([
            a,
            Expression::pow(b, Expression::integer(-1)),
        ])),
    }
}

/// Remainder of two numbers.
///
/// # Errors
/// Fails with [`SymError::NotNumeric`] if either side is not a number and
/// with [`SymError::DivideByZero`] if `b` is zero.
pub fn rem(a: Expression, b: Expression) -> SymResult<Expression> {
    match numbers(&a, &b) {
        Some((x, y)) => Ok(Expression::number((x % y)?)),
        None if a.is_number() => Err(SymError::NotNumeric(b.to_string())),
        None => Err(SymError::NotNumeric(a.to_string())),
    }
}

#[must_use]
pub fn neg(a: Expression) -> Expression {
    match a.as_number() {
        Some(x) => Expression::number(-*x),
        None => Expression::product([Expression::integer(-1), a]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_fold() {
        let sum = add(Expression::integer(10), Expression::integer(1));
        assert!(matches!(sum.as_number(), Some(crate::Number::Integer(11))));
        let quot = div(Expression::integer(1), Expression::integer(4)).unwrap();
        assert_eq!(quot, Expression::rational(1, 4).unwrap());
    }

    #[test]
    fn symbols_build_trees() {
        let x = Expression::variable("x");
        let diff = sub(x.clone(), Expression::integer(2));
        assert!(diff.is_sum());
        assert_eq!(diff.to_string(), "x-2");
        let quot = div(Expression::integer(1), x.clone()).unwrap();
        assert_eq!(quot.to_string(), "1*x^(-1)");
        assert!(matches!(
            div(x.clone(), Expression::integer(0)),
            Err(SymError::DivideByZero)
        ));
        assert!(matches!(
            rem(x, Expression::integer(2)),
            Err(SymError::NotNumeric(_))
        ));
    }
}
