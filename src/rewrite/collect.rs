use super::functions;
use crate::arith;
use crate::error::SymResult;
use crate::expr::{Expression, FunctionKind, Node};
use crate::number::Number;
use crate::utils::Tree;

/// `Sum` of the terms, an empty sum is `0` and a single term stands alone.
pub(crate) fn collapse_sum(mut terms: Vec<Expression>) -> Expression {
    match terms.len() {
        0 => Expression::integer(0),
        1 => terms.swap_remove(0),
        _ => Expression::new(Node::Sum(terms)),
    }
}

/// `Product` of the factors, an empty product is `1` and a single factor
/// stands alone.
pub(crate) fn collapse_product(mut factors: Vec<Expression>) -> Expression {
    match factors.len() {
        0 => Expression::integer(1),
        1 => factors.swap_remove(0),
        _ => Expression::new(Node::Product(factors)),
    }
}

/// Splits `c*t` into its leading numeric coefficient and the rest.
fn split_coefficient(term: Expression) -> (Number, Expression) {
    let lead = match term.node() {
        Node::Product(factors) if factors.len() > 1 => factors[0].as_number().copied(),
        _ => None,
    };
    match lead {
        Some(c) => {
            let mut factors = term.into_node().into_children();
            factors.remove(0);
            (c, collapse_product(factors))
        }
        None => (Number::Integer(1), term),
    }
}

/// Splits `b^n` into base and exponent, anything else has exponent `1`.
fn split_power(factor: Expression) -> (Expression, Expression) {
    if factor.as_function_of(FunctionKind::Pow).is_some() {
        let mut args = factor.into_node().into_children();
        let exponent = args.pop().unwrap_or_default();
        let base = args.pop().unwrap_or_default();
        return (base, exponent);
    }
    (factor, Expression::integer(1))
}

/// Merges like terms.
///
/// Terms whose non-numeric part compares equal are combined by adding their
/// coefficients, zero coefficients vanish and the net numeric literal goes
/// last.
pub(crate) fn collect_sum(terms: Vec<Expression>) -> Expression {
    let mut numeric = Number::Integer(0);
    let mut groups: Vec<(Expression, Number)> = Vec::new();
    for term in Expression::sum(terms).into_node().into_children() {
        if let Some(n) = term.as_number() {
            numeric = numeric + *n;
            continue;
        }
        let (coefficient, rest) = split_coefficient(term);
        match groups.iter_mut().find(|(t, _)| *t == rest) {
            Some((_, c)) => *c = *c + coefficient,
            None => groups.push((rest, coefficient)),
        }
    }

    let mut out = Vec::with_capacity(groups.len() + 1);
    for (term, coefficient) in groups {
        if coefficient.is_zero() {
            continue;
        }
        if coefficient.is_one() {
            out.push(term);
        } else {
            out.push(Expression::product([Expression::number(coefficient), term]));
        }
    }
    if !numeric.is_zero() {
        out.push(Expression::number(numeric));
    }
    collapse_sum(out)
}

/// Merges like factors.
///
/// Factors with equal bases are combined by adding their exponents, exponent
/// `0` drops the factor and exponent `1` leaves the bare base. The net numeric
/// literal goes first and a zero factor collapses the whole product.
pub(crate) fn collect_product(factors: Vec<Expression>) -> SymResult<Expression> {
    let mut numeric = Number::Integer(1);
    let mut groups: Vec<(Expression, Expression)> = Vec::new();
    for factor in Expression::product(factors).into_node().into_children() {
        if let Some(n) = factor.as_number() {
            if n.is_zero() {
                return Ok(factor);
            }
            numeric = numeric * *n;
            continue;
        }
        let (base, exponent) = split_power(factor);
        match groups.iter_mut().find(|(b, _)| *b == base) {
            Some((_, e)) => *e = arith::add(e.take(), exponent),
            None => groups.push((base, exponent)),
        }
    }

    let mut out = Vec::with_capacity(groups.len() + 1);
    for (base, exponent) in groups {
        let exponent = if exponent.is_sum() {
            collect_sum(exponent.into_node().into_children())
        } else {
            exponent
        };
        if exponent.is_zero() {
            continue;
        }
        if exponent.is_one() {
            out.push(base);
            continue;
        }
        let power = Expression::pow(base, exponent);
        let power = match functions::simplify_function(&power)? {
            Some(folded) => folded,
            None => power,
        };
        match power.as_number() {
            Some(n) if n.is_zero() => return Ok(power),
            Some(n) => numeric = numeric * *n,
            None => out.push(power),
        }
    }
    if numeric.is_zero() {
        return Ok(Expression::number(numeric));
    }
    if !numeric.is_one() {
        out.insert(0, Expression::number(numeric));
    }
    Ok(collapse_product(out))
}

/// Bottom-up `collect` over every sum and product in the tree.
pub(crate) fn collect(mut expr: Expression) -> SymResult<Expression> {
    for child in expr.children_mut() {
        *child = collect(child.take())?;
    }
    match expr.into_node() {
        Node::Sum(terms) => Ok(collect_sum(terms)),
        Node::Product(factors) => collect_product(factors),
        node => Ok(Expression::new(node)),
    }
}
