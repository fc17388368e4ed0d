//! Local rewrite rules of the named functions.
//!
//! Every rule looks at one function node whose arguments are already
//! simplified and either proposes a replacement or leaves the node alone.

use log::trace;

use crate::arith;
use crate::error::SymResult;
use crate::expr::{Expression, Function, FunctionKind, Node};
use crate::number::{Number, Rank};

use super::collect::collapse_product;

/// Proposes a replacement for a function node, `None` if no rule applies.
pub(crate) fn simplify_function(expr: &Expression) -> SymResult<Option<Expression>> {
    let Some(f) = expr.as_function() else {
        return Ok(None);
    };
    let rewritten = match f.kind() {
        FunctionKind::Sin => odd(f, Expression::sin, f64::sin),
        FunctionKind::Sinh => odd(f, Expression::sinh, f64::sinh),
        FunctionKind::Cos => even(f, Expression::cos, f64::cos),
        FunctionKind::Cosh => even(f, Expression::cosh, f64::cosh),
        FunctionKind::Abs => abs(&f.args[0]),
        FunctionKind::Log => log(&f.args[0], &f.args[1]),
        FunctionKind::Pow => pow(&f.args[0], &f.args[1])?,
    };
    if let Some(new) = &rewritten {
        trace!("{expr} => {new}");
    }
    Ok(rewritten)
}

/// The factors after a leading `-1`, if the argument is such a product.
fn negated_rest(arg: &Expression) -> Option<Expression> {
    match arg.node() {
        Node::Product(factors)
            if factors.len() > 1 && factors[0].as_number().is_some_and(is_minus_one) =>
        {
            Some(collapse_product(factors[1..].to_vec()))
        }
        _ => None,
    }
}

fn is_minus_one(n: &Number) -> bool {
    n.compare_number(&Number::Integer(-1)).is_eq()
}

/// `f(0) = 0`, `f(-x) = -f(x)`.
fn odd(
    f: &Function,
    build: fn(Expression) -> Expression,
    eval: fn(f64) -> f64,
) -> Option<Expression> {
    let arg = &f.args[0];
    if arg.is_zero() {
        return Some(Expression::integer(0));
    }
    if let Some(n) = arg.as_number() {
        return Some(Expression::real(eval(n.to_f64())));
    }
    negated_rest(arg).map(|rest| Expression::product([Expression::integer(-1), build(rest)]))
}

/// `f(0) = 1`, `f(-x) = f(x)`.
fn even(
    f: &Function,
    build: fn(Expression) -> Expression,
    eval: fn(f64) -> f64,
) -> Option<Expression> {
    let arg = &f.args[0];
    if arg.is_zero() {
        return Some(Expression::integer(1));
    }
    if let Some(n) = arg.as_number() {
        return Some(Expression::real(eval(n.to_f64())));
    }
    negated_rest(arg).map(build)
}

fn abs(arg: &Expression) -> Option<Expression> {
    let n = arg.as_number()?;
    if n.is_negative() {
        Some(Expression::number(-*n))
    } else {
        Some(arg.clone())
    }
}

fn positive(e: &Expression) -> Option<&Number> {
    e.as_number().filter(|n| !n.is_negative() && !n.is_zero())
}

fn log(x: &Expression, base: &Expression) -> Option<Expression> {
    if x.is_one() {
        return Some(Expression::integer(0));
    }
    if x == base {
        return Some(Expression::integer(1));
    }
    // log_b(b^c) = c
    if let Some(p) = x.as_function_of(FunctionKind::Pow) {
        if p.args[0] == *base {
            return Some(p.args[1].clone());
        }
    }
    if base.is_euler() {
        return positive(x).map(|n| Expression::real(n.to_f64().ln()));
    }
    let b = positive(base).filter(|b| !b.is_one())?;
    let ln_b = b.to_f64().ln();
    Some(match positive(x) {
        Some(n) => Expression::real(n.to_f64().ln() / ln_b),
        None => Expression::product([Expression::real(1.0 / ln_b), Expression::ln(x.clone())]),
    })
}

fn pow(base: &Expression, exponent: &Expression) -> SymResult<Option<Expression>> {
    if exponent.is_zero() || base.is_one() {
        return Ok(Some(Expression::integer(1)));
    }
    if exponent.is_one() {
        return Ok(Some(base.clone()));
    }
    if base.is_zero() {
        return Ok(Some(Expression::integer(0)));
    }
    // (b^a)^n = b^(a*n)
    if let Some(inner) = base.as_function_of(FunctionKind::Pow) {
        let folded = arith::mul(inner.args[1].clone(), exponent.clone());
        return Ok(Some(Expression::pow(inner.args[0].clone(), folded)));
    }
    // b^log_b(y) = y
    if let Some(l) = exponent.as_function_of(FunctionKind::Log) {
        if l.args[1] == *base {
            return Ok(Some(l.args[0].clone()));
        }
    }
    let (Some(b), Some(n)) = (base.as_number(), exponent.as_number()) else {
        return Ok(None);
    };
    if b.rank() != Rank::Real && n.rank() != Rank::Real && n.is_integral() {
        return Ok(Some(Expression::number(b.pow_integer(n.to_i64()?)?)));
    }
    let (bf, nf) = (b.to_f64(), n.to_f64());
    if bf >= 0.0 || n.is_integral() {
        return Ok(Some(Expression::real(bf.powf(nf))));
    }
    Ok(None)
}
