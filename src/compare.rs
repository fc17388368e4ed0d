//! Canonical comparison of expressions.
//!
//! [`compare`] is a total order over all trees. It backs `==`, sorting and
//! every pattern lookup in the rewriting passes.

use std::cmp::Ordering;

use crate::error::{SymError, SymResult};
use crate::expr::{Expression, Node, Relation};
use crate::utils::Tree;

/// Canonical total order.
///
/// Kinds are compared first by their fixed tag order. Leaves then compare by
/// payload, ordered internal nodes by arity and then child by child, and
/// commutative nodes (sums, products, commutative functions, `==` and `!=`)
/// by arity and then by their children as multisets.
#[must_use]
pub fn compare(a: &Expression, b: &Expression) -> Ordering {
    let kind = a.kind().cmp(&b.kind());
    if kind.is_ne() {
        return kind;
    }
    match (a.node(), b.node()) {
        (Node::Number(x), Node::Number(y)) => x.compare_number(y),
        (Node::Variable(x), Node::Variable(y)) => x
            .kind()
            .cmp(&y.kind())
            .then_with(|| x.name().cmp(y.name())),
        (Node::Constant(x), Node::Constant(y)) => x
            .name()
            .cmp(y.name())
            .then_with(|| compare(x.value(), y.value())),
        (Node::Sum(x), Node::Sum(y)) | (Node::Product(x), Node::Product(y)) => multiset(x, y),
        (Node::Function(f), Node::Function(g)) => f
            .is_commutative()
            .cmp(&g.is_commutative())
            .then_with(|| children(a, b)),
        (Node::Statement(s), Node::Statement(t)) => s
            .relation()
            .cmp(&t.relation())
            .then_with(|| children(a, b)),
        // Equal kinds always mean equal variants.
        _ => Ordering::Equal,
    }
}

fn children(a: &Expression, b: &Expression) -> Ordering {
    if a.is_commutative() {
        multiset(a.children(), b.children())
    } else {
        sequence(a.children(), b.children())
    }
}

fn first_difference<'a>(pairs: impl Iterator<Item = (&'a Expression, &'a Expression)>) -> Ordering {
    pairs
        .map(|(x, y)| compare(x, y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn sequence(a: &[Expression], b: &[Expression]) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| first_difference(a.iter().zip(b)))
}

/// Two multisets are equal iff their sorted sequences are pairwise equal, so
/// sorting finds the bijection and gives a deterministic tie-break otherwise.
fn multiset(a: &[Expression], b: &[Expression]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| {
        let a = sorted(a);
        let b = sorted(b);
        first_difference(a.into_iter().zip(b))
    })
}

fn sorted(xs: &[Expression]) -> Vec<&Expression> {
    let mut refs = xs.iter().collect::<Vec<_>>();
    refs.sort_by(|x, y| compare(x, y));
    refs
}

/// Exact structural identity: same layout, same child order, same numeric
/// kinds. Used to detect whether a rewrite changed anything at all.
pub(crate) fn identical(a: &Expression, b: &Expression) -> bool {
    let all = |x: &[Expression], y: &[Expression]| {
        x.len() == y.len() && x.iter().zip(y).all(|(x, y)| identical(x, y))
    };
    match (a.node(), b.node()) {
        (Node::Number(x), Node::Number(y)) => {
            x.rank() == y.rank() && x.compare_number(y).is_eq()
        }
        (Node::Variable(x), Node::Variable(y)) => {
            x.name == y.name && x.kind == y.kind && x.slot == y.slot
        }
        (Node::Constant(x), Node::Constant(y)) => x.name == y.name && identical(&x.value, &y.value),
        (Node::Sum(x), Node::Sum(y)) | (Node::Product(x), Node::Product(y)) => all(x, y),
        (Node::Function(f), Node::Function(g)) => {
            f.kind == g.kind && f.commutative == g.commutative && all(&f.args, &g.args)
        }
        (Node::Statement(s), Node::Statement(t)) => s.relation == t.relation && all(&s.sides, &t.sides),
        _ => false,
    }
}

impl Expression {
    /// Boolean value of a statement, its sides ordered by [`compare`].
    /// Numbers and constants are true when non-zero.
    ///
    /// # Errors
    /// Fails with [`SymError::NotNumeric`] for any other node.
    pub fn truth(&self) -> SymResult<bool> {
        match self.node() {
            Node::Statement(s) => {
                let order = compare(s.lhs(), s.rhs());
                Ok(match s.relation() {
                    Relation::Eq => order.is_eq(),
                    Relation::Ne => order.is_ne(),
                    Relation::Lt => order.is_lt(),
                    Relation::Le => order.is_le(),
                    Relation::Gt => order.is_gt(),
                    Relation::Ge => order.is_ge(),
                })
            }
            Node::Number(n) => Ok(!n.is_zero()),
            Node::Constant(_) => Ok(self.to_f64()? != 0.0),
            _ => Err(SymError::NotNumeric(self.to_string())),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other).is_eq()
    }
}

impl Eq for Expression {}

impl PartialOrd for Expression {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Expression {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::VarKind;

    fn var(name: &str) -> Expression {
        Expression::variable(name)
    }

    #[test]
    fn sums_and_products_ignore_order() {
        let (a, b, c) = (var("a"), var("b"), var("c"));
        assert_eq!(
            Expression::sum([a.clone(), b.clone()]),
            Expression::sum([b.clone(), a.clone()])
        );
        assert_eq!(
            Expression::product([a.clone(), b.clone(), c.clone()]),
            Expression::product([c, a, b])
        );
    }

    #[test]
    fn multiplicity_matters() {
        let (a, b) = (var("a"), var("b"));
        let aab = Expression::sum([a.clone(), a.clone(), b.clone()]);
        let abb = Expression::sum([a.clone(), b.clone(), b]);
        assert_ne!(aab, abb);
        assert_eq!(compare(&aab, &abb), compare(&aab, &abb));
        assert_eq!(compare(&aab, &abb), compare(&abb, &aab).reverse());
    }

    #[test]
    fn ordered_functions_respect_argument_order() {
        let (x, y) = (var("x"), var("y"));
        let xy = Expression::pow(x.clone(), y.clone());
        let yx = Expression::pow(y.clone(), x.clone());
        assert_ne!(xy, yx);
        assert_eq!(xy.clone().toggle_commutative(), yx.toggle_commutative());
        assert_ne!(xy.clone(), xy.toggle_commutative());
    }

    #[test]
    fn statements_commute_only_for_equality() {
        let (x, y) = (var("x"), var("y"));
        assert_eq!(
            Expression::equal(x.clone(), y.clone()),
            Expression::equal(y.clone(), x.clone())
        );
        assert_eq!(
            Expression::not_equal(x.clone(), y.clone()),
            Expression::not_equal(y.clone(), x.clone())
        );
        assert_ne!(
            Expression::statement(x.clone(), y.clone(), Relation::Le),
            Expression::statement(y, x, Relation::Le)
        );
    }

    #[test]
    fn leaves() {
        assert_eq!(Expression::integer(2), Expression::real(2.0));
        assert!(Expression::integer(1) < Expression::rational(3, 2).unwrap());
        assert_ne!(
            Expression::typed_variable("x", VarKind::Int),
            Expression::variable("x")
        );
        assert!(Expression::integer(100) < var("a"));
        assert!(var("a") < var("b"));
        assert_ne!(Expression::pi(), Expression::e());
    }

    #[test]
    fn identity_is_stricter_than_equality() {
        let (a, b) = (var("a"), var("b"));
        let ab = Expression::sum([a.clone(), b.clone()]);
        let ba = Expression::sum([b, a]);
        assert_eq!(ab, ba);
        assert!(!identical(&ab, &ba));
        assert!(identical(&ab, &ab.clone()));
        assert!(!identical(&Expression::integer(2), &Expression::real(2.0)));
    }

    #[test]
    fn kind_order_is_fixed() {
        let x = var("x");
        let mut items = vec![
            Expression::equal(x.clone(), x.clone()),
            Expression::pow(x.clone(), x.clone()),
            Expression::sin(x.clone()),
            Expression::product([x.clone(), x.clone()]),
            Expression::sum([x.clone(), x.clone()]),
            Expression::pi(),
            x.clone(),
            Expression::integer(3),
        ];
        items.sort();
        assert!(items[0].is_number());
        assert!(items[1].is_variable());
        assert!(items[2].is_constant());
        assert!(items[3].is_sum());
        assert!(items[4].is_product());
        assert!(items[7].is_statement());
    }

    #[test]
    fn large_mixed_numbers_in_sums() {
        let big = 1i64 << 53;
        let terms = (0..80)
            .map(|k| {
                if k % 2 == 0 {
                    Expression::integer(big + k)
                } else {
                    Expression::real((big + k - 1) as f64)
                }
            })
            .collect::<Vec<_>>();
        let forward = Expression::sum(terms.clone());
        let backward = Expression::sum(terms.into_iter().rev());
        assert_eq!(forward, backward);

        let x = var("x");
        let a = Expression::sum([x.clone(), Expression::integer(big + 1)]);
        let b = Expression::sum([x.clone(), Expression::real(big as f64)]);
        let c = Expression::sum([x, Expression::integer(big)]);
        assert_ne!(a, b);
        assert_eq!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn truth_of_statements() {
        let (x, y) = (var("x"), var("y"));
        assert!(Expression::equal(x.clone(), x.clone()).truth().unwrap());
        assert!(Expression::not_equal(x.clone(), y.clone()).truth().unwrap());
        assert!(Expression::less(Expression::integer(1), Expression::real(1.5)).truth().unwrap());
        assert!(!Expression::greater(Expression::integer(2), Expression::integer(2)).truth().unwrap());
        assert!(Expression::greater_equal(Expression::integer(2), Expression::integer(2)).truth().unwrap());
        assert!(Expression::pi().truth().unwrap());
        assert!(!Expression::integer(0).truth().unwrap());
        assert!(matches!(x.truth(), Err(SymError::NotNumeric(_))));
    }
}
