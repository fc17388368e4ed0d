use std::fmt;

use super::{Expression, Function, FunctionKind, Node};
use crate::utils::Tree;

/// Terms that carry their own leading minus sign.
fn prints_negative(term: &Expression) -> bool {
    term.is_negative()
        || (term.is_product() && term.children().first().is_some_and(Expression::is_negative))
}

/// Factors and powers that need no parentheses.
fn is_atomic(e: &Expression) -> bool {
    match e.node() {
        Node::Variable(_) | Node::Constant(_) => true,
        Node::Number(n) => !n.is_negative() && !matches!(n, crate::Number::Rational(_)),
        Node::Function(f) => f.kind() != FunctionKind::Pow,
        _ => false,
    }
}

fn is_minus_one(e: &Expression) -> bool {
    e.as_number()
        .is_some_and(|n| n.is_negative() && n.to_f64() == -1.0)
}

fn write_wrapped(e: &Expression, wrap: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if wrap {
        write!(f, "({e})")
    } else {
        write!(f, "{e}")
    }
}

fn fmt_sum(terms: &[Expression], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if terms.is_empty() {
        return write!(f, "0");
    }
    for (i, term) in terms.iter().enumerate() {
        if i > 0 && !prints_negative(term) {
            write!(f, "+")?;
        }
        write_wrapped(term, term.is_sum() || term.is_statement(), f)?;
    }
    Ok(())
}

fn fmt_product(factors: &[Expression], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rest = match factors {
        [] => return write!(f, "1"),
        [lead, tail @ ..] if !tail.is_empty() && is_minus_one(lead) => {
            write!(f, "-")?;
            tail
        }
        _ => factors,
    };
    for (i, factor) in rest.iter().enumerate() {
        if i > 0 {
            write!(f, "*")?;
        }
        let wrap = match factor.node() {
            Node::Sum(_) | Node::Product(_) | Node::Statement(_) => true,
            Node::Number(n) => i > 0 && n.is_negative(),
            _ => false,
        };
        write_wrapped(factor, wrap, f)?;
    }
    Ok(())
}

fn fmt_function(func: &Function, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (func.kind(), func.args()) {
        (FunctionKind::Pow, [base, exponent]) => {
            write_wrapped(base, !is_atomic(base), f)?;
            write!(f, "^")?;
            write_wrapped(exponent, !is_atomic(exponent), f)
        }
        (FunctionKind::Log, [x, base]) if base.is_euler() => write!(f, "ln({x})"),
        (FunctionKind::Log, [x, base]) => write!(f, "log({x}, {base})"),
        (kind, args) => {
            write!(f, "{kind}(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ")")
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Node::Number(n) => write!(f, "{n}"),
            Node::Variable(v) => write!(f, "{}", v.name()),
            Node::Constant(c) => write!(f, "{}", c.name()),
            Node::Sum(terms) => fmt_sum(terms, f),
            Node::Product(factors) => fmt_product(factors, f),
            Node::Function(func) => fmt_function(func, f),
            Node::Statement(s) => write!(f, "{} {} {}", s.lhs(), s.relation(), s.rhs()),
        }
    }
}
