use crate::arith;
use crate::expr::{Expression, Function, FunctionKind, Node};
use crate::utils::Tree;

use super::small_power;

/// Distributes products over sums and expands powers, bottom-up.
pub(crate) fn expand(mut expr: Expression) -> Expression {
    for child in expr.children_mut() {
        *child = expand(child.take());
    }
    match expr.into_node() {
        Node::Sum(terms) => Expression::sum(terms),
        Node::Product(factors) => distribute(factors),
        Node::Function(f) if f.kind() == FunctionKind::Pow => {
            let (base, exponent) = pow_args(f);
            expand_power(base, exponent)
        }
        node => Expression::new(node),
    }
}

fn pow_args(f: Function) -> (Expression, Expression) {
    let mut args = f.args.into_iter();
    let base = args.next().unwrap_or_default();
    let exponent = args.next().unwrap_or_default();
    (base, exponent)
}

/// `a*(b+c)*d` becomes `a*b*d + a*c*d`, recursively until no factor is a sum.
fn distribute(factors: Vec<Expression>) -> Expression {
    let mut factors = Expression::product(factors).into_node().into_children();
    let Some(at) = factors.iter().position(Expression::is_sum) else {
        return Expression::product(factors);
    };
    let terms = factors.remove(at).into_node().into_children();
    Expression::sum(terms.into_iter().map(|term| {
        let mut next = factors.clone();
        next.insert(at, term);
        distribute(next)
    }))
}

/// `a^(b+c) = a^b*a^c`, `(a*b)^c = a^c*b^c` and `(a+b)^k` for integers `k >= 2`.
fn expand_power(base: Expression, exponent: Expression) -> Expression {
    if exponent.is_sum() {
        let factors = exponent
            .into_node()
            .into_children()
            .into_iter()
            .map(|e| expand_power(base.clone(), e))
            .collect();
        return distribute(factors);
    }
    if base.is_product() {
        let factors = base
            .into_node()
            .into_children()
            .into_iter()
            .map(|b| expand_power(b, exponent.clone()))
            .collect();
        return distribute(factors);
    }
    match small_power(&exponent) {
        Some(k) if base.is_sum() => square_and_multiply(base, k),
        _ => Expression::pow(base, exponent),
    }
}

/// Applies `rule` to every `Pow` node bottom-up and leaves all other nodes
/// alone.
pub(crate) fn rewrite_powers(
    mut expr: Expression,
    rule: fn(Expression, Expression) -> Expression,
) -> Expression {
    for child in expr.children_mut() {
        *child = rewrite_powers(child.take(), rule);
    }
    match expr.into_node() {
        Node::Function(f) if f.kind() == FunctionKind::Pow => {
            let (base, exponent) = pow_args(f);
            rule(base, exponent)
        }
        node => Expression::new(node),
    }
}

/// `a^(b+c) = a^b*a^c`
pub(crate) fn power_exp(base: Expression, exponent: Expression) -> Expression {
    if !exponent.is_sum() {
        return Expression::pow(base, exponent);
    }
    Expression::product(
        exponent
            .into_node()
            .into_children()
            .into_iter()
            .map(|e| Expression::pow(base.clone(), e)),
    )
}

/// `(a*b)^c = a^c*b^c`
pub(crate) fn power_base(base: Expression, exponent: Expression) -> Expression {
    if !base.is_product() {
        return Expression::pow(base, exponent);
    }
    Expression::product(
        base.into_node()
            .into_children()
            .into_iter()
            .map(|b| Expression::pow(b, exponent.clone())),
    )
}

/// `(a^b)^c = a^(b*c)`
pub(crate) fn denest(base: Expression, exponent: Expression) -> Expression {
    match base.into_node() {
        Node::Function(f) if f.kind() == FunctionKind::Pow => {
            let (inner, power) = pow_args(f);
            Expression::pow(inner, arith::mul(power, exponent))
        }
        node => Expression::pow(Expression::new(node), exponent),
    }
}

/// Binary exponentiation of a sum, every intermediate product is distributed.
fn square_and_multiply(base: Expression, mut k: u32) -> Expression {
    let mut result: Option<Expression> = None;
    let mut square = base;
    loop {
        if k & 1 == 1 {
            result = Some(match result {
                Some(acc) => distribute(vec![acc, square.clone()]),
                None => square.clone(),
            });
        }
        k >>= 1;
        if k == 0 {
            break;
        }
        square = distribute(vec![square.clone(), square]);
    }
    result.unwrap_or_else(|| Expression::integer(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::collect::collect;

    fn var(name: &str) -> Expression {
        Expression::variable(name)
    }

    #[test]
    fn distribution_law() {
        let (a, b, c, d) = (var("a"), var("b"), var("c"), var("d"));
        let lhs = expand(Expression::product([
            Expression::sum([a.clone(), b.clone()]),
            Expression::sum([c.clone(), d.clone()]),
        ]));
        let rhs = collect(Expression::sum([
            Expression::product([a.clone(), c.clone()]),
            Expression::product([a, d.clone()]),
            Expression::product([b.clone(), c]),
            Expression::product([b, d]),
        ]))
        .unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn nested_distribution() {
        let (a, b, c) = (var("a"), var("b"), var("c"));
        let e = expand(Expression::product([
            a.clone(),
            Expression::sum([b.clone(), Expression::product([c.clone(), Expression::sum([a.clone(), b.clone()])])]),
        ]));
        assert!(e.is_sum());
        assert_eq!(e.len(), 3);
        assert!(e.children().iter().all(|t| !t.children().iter().any(Expression::is_sum)));
    }

    #[test]
    fn power_of_sum_exponent() {
        let (a, b, c) = (var("a"), var("b"), var("c"));
        let e = expand(Expression::pow(a.clone(), Expression::sum([b.clone(), c.clone()])));
        assert_eq!(
            e,
            Expression::product([Expression::pow(a.clone(), b), Expression::pow(a, c)])
        );
    }

    #[test]
    fn power_of_product_base() {
        let (a, b, c) = (var("a"), var("b"), var("c"));
        let e = expand(Expression::pow(Expression::product([a.clone(), b.clone()]), c.clone()));
        assert_eq!(
            e,
            Expression::product([Expression::pow(a, c.clone()), Expression::pow(b, c)])
        );
    }

    #[test]
    fn binomial_square() {
        let (a, b) = (var("a"), var("b"));
        let e = expand(Expression::pow(
            Expression::sum([a.clone(), b.clone()]),
            Expression::integer(2),
        ));
        let e = collect(e).unwrap();
        let expected = Expression::sum([
            Expression::pow(a.clone(), Expression::integer(2)),
            Expression::product([Expression::integer(2), a, b.clone()]),
            Expression::pow(b, Expression::integer(2)),
        ]);
        assert_eq!(e, expected);
    }

    #[test]
    fn cube_has_eight_terms_before_collect() {
        let (a, b) = (var("a"), var("b"));
        let e = expand(Expression::pow(Expression::sum([a, b]), Expression::integer(3)));
        assert_eq!(e.len(), 8);
    }

    #[test]
    fn symbolic_exponents_stay() {
        let (a, b, n) = (var("a"), var("b"), var("n"));
        let p = Expression::pow(Expression::sum([a, b]), n);
        assert_eq!(expand(p.clone()), p);
    }
}
