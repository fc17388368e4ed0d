//! Numeric evaluation of expressions.
//!
//! Variables read their value from three typed input arrays through the slot
//! [`Expression::put_indexes`] assigned them. [`Expression::evaluate`] walks
//! the tree, [`Expression::lambdify`] turns it into nested closures first. Both
//! perform the same floating point operations in the same order, and so does
//! the code that [`crate::jit`] generates.

use crate::error::{SymError, SymResult};
use crate::expr::{Expression, FunctionKind, Node, Relation, VarKind, Variable};
use crate::number::Number;
use crate::utils::Tree;

mod index;
mod lambdify;

pub use index::{Arity, SlotTables};
pub use lambdify::Lambdified;

/// Borrowed input arrays, indexed by slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct Inputs<'a> {
    pub bools: &'a [bool],
    pub ints: &'a [i64],
    pub reals: &'a [f64],
}

impl<'a> Inputs<'a> {
    #[must_use]
    pub fn new(bools: &'a [bool], ints: &'a [i64], reals: &'a [f64]) -> Self {
        Inputs { bools, ints, reals }
    }

    /// Only real inputs.
    #[must_use]
    pub fn reals(reals: &'a [f64]) -> Self {
        Inputs {
            reals,
            ..Inputs::default()
        }
    }

    #[must_use]
    pub fn len(&self, kind: VarKind) -> usize {
        match kind {
            VarKind::Bool => self.bools.len(),
            VarKind::Int => self.ints.len(),
            VarKind::Real => self.reals.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bools.is_empty() && self.ints.is_empty() && self.reals.is_empty()
    }

    fn slot(&self, v: &Variable) -> SymResult<usize> {
        let slot = v
            .slot()
            .ok_or_else(|| SymError::UnassignedSlot(v.name().to_owned()))?;
        let len = self.len(v.kind());
        if slot >= len {
            return Err(SymError::IndexOutOfRange {
                kind: v.kind(),
                slot,
                len,
            });
        }
        Ok(slot)
    }

    /// The variable's input as an exact number of its kind.
    fn exact(&self, v: &Variable) -> SymResult<Number> {
        let slot = self.slot(v)?;
        Ok(match v.kind() {
            VarKind::Bool => Number::Boolean(self.bools[slot]),
            VarKind::Int => Number::Integer(self.ints[slot]),
            VarKind::Real => Number::Real(self.reals[slot]),
        })
    }

    fn value(&self, v: &Variable) -> SymResult<f64> {
        self.exact(v).map(|n| n.to_f64())
    }
}

/// Signed slack of a statement, non-negative exactly when it holds.
#[must_use]
pub fn slack(relation: Relation, lhs: f64, rhs: f64) -> f64 {
    match relation {
        Relation::Eq => (lhs - rhs).abs(),
        Relation::Ne => -(lhs - rhs).abs(),
        Relation::Gt | Relation::Ge => lhs - rhs,
        Relation::Lt | Relation::Le => rhs - lhs,
    }
}

/// The float function behind a one-argument function kind, `None` for `Log`
/// and `Pow`.
pub(crate) fn unary(kind: FunctionKind) -> Option<fn(f64) -> f64> {
    match kind {
        FunctionKind::Abs => Some(f64::abs),
        FunctionKind::Sin => Some(f64::sin),
        FunctionKind::Cos => Some(f64::cos),
        FunctionKind::Sinh => Some(f64::sinh),
        FunctionKind::Cosh => Some(f64::cosh),
        FunctionKind::Log | FunctionKind::Pow => None,
    }
}

/// Logarithm to base `b`, computed as `ln(x) / ln(b)` unless the base is `e`.
pub(crate) fn logarithm(x: f64, b: Option<f64>) -> f64 {
    match b {
        None => x.ln(),
        Some(b) => x.ln() / b.ln(),
    }
}

fn eval_node(expr: &Expression, inputs: &Inputs<'_>) -> SymResult<f64> {
    Ok(match expr.node() {
        Node::Number(n) => n.to_f64(),
        Node::Variable(v) => inputs.value(v)?,
        Node::Constant(c) => eval_node(c.value(), inputs)?,
        Node::Sum(terms) => {
            let mut acc = 0.0;
            for term in terms {
                acc += eval_node(term, inputs)?;
            }
            acc
        }
        Node::Product(factors) => {
            let mut acc = 1.0;
            for factor in factors {
                acc *= eval_node(factor, inputs)?;
            }
            acc
        }
        Node::Function(f) => {
            let args = f.args();
            let x = eval_node(&args[0], inputs)?;
            if let Some(g) = unary(f.kind()) {
                g(x)
            } else if f.kind() == FunctionKind::Pow {
                x.powf(eval_node(&args[1], inputs)?)
            } else if args[1].is_euler() {
                logarithm(x, None)
            } else {
                logarithm(x, Some(eval_node(&args[1], inputs)?))
            }
        }
        Node::Statement(s) => slack(
            s.relation(),
            eval_node(s.lhs(), inputs)?,
            eval_node(s.rhs(), inputs)?,
        ),
    })
}

/// Replaces variables by their exact input values and constants by reals.
fn bind(expr: &mut Expression, inputs: &Inputs<'_>) -> SymResult<()> {
    let bound = match expr.node() {
        Node::Variable(v) => Some(Expression::number(inputs.exact(v)?)),
        Node::Constant(c) => Some(Expression::real(eval_node(c.value(), inputs)?)),
        _ => None,
    };
    match bound {
        Some(b) => *expr = b,
        None => {
            for child in expr.children_mut() {
                bind(child, inputs)?;
            }
        }
    }
    Ok(())
}

impl Expression {
    /// Numeric value for the given inputs. Statements give their signed
    /// slack, see [`slack`].
    ///
    /// # Errors
    /// Fails with [`SymError::UnassignedSlot`] before [`Expression::put_indexes`]
    /// ran and with [`SymError::IndexOutOfRange`] if an input array is too short.
    pub fn evaluate(&self, inputs: &Inputs<'_>) -> SymResult<f64> {
        Arity::of(self)?.check(inputs)?;
        eval_node(self, inputs)
    }

    /// Substitutes the inputs as exact numbers of each variable's kind and
    /// simplifies what is left.
    ///
    /// # Errors
    /// See [`Expression::evaluate`], and simplification may hit a division by
    /// zero.
    pub fn evaluate_sym(&self, inputs: &Inputs<'_>) -> SymResult<Expression> {
        Arity::of(self)?.check(inputs)?;
        let mut bound = self.clone();
        bind(&mut bound, inputs)?;
        bound.simplify()?;
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rastrigin() -> Expression {
        "(+ (* 10 2) (pow x1 2) (* -10 (cos (* 2 pi x1))) (pow x2 2) (* -10 (cos (* 2 pi x2))))"
            .parse()
            .unwrap()
    }

    #[test]
    fn rastrigin_minimum() {
        let mut e = rastrigin();
        e.put_indexes();
        let v = e.evaluate(&Inputs::reals(&[0.0, 0.0])).unwrap();
        assert_eq!(v, 0.0);
        let v = e.evaluate(&Inputs::reals(&[1.0, 0.0])).unwrap();
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn satisfied_equation_has_zero_slack() {
        let x = Expression::variable("x");
        let mut e = Expression::equal(x.clone(), x);
        e.put_indexes();
        assert_eq!(e.evaluate(&Inputs::reals(&[3.5])).unwrap(), 0.0);
        let closed = Expression::equal(Expression::integer(2), Expression::integer(2));
        assert_eq!(closed.evaluate(&Inputs::default()).unwrap(), 0.0);
    }

    #[test]
    fn slack_signs() {
        assert_eq!(slack(Relation::Eq, 1.0, 3.0), 2.0);
        assert_eq!(slack(Relation::Ne, 1.0, 3.0), -2.0);
        assert_eq!(slack(Relation::Ge, 1.0, 3.0), -2.0);
        assert_eq!(slack(Relation::Gt, 3.0, 1.0), 2.0);
        assert_eq!(slack(Relation::Le, 1.0, 3.0), 2.0);
        assert_eq!(slack(Relation::Lt, 3.0, 1.0), -2.0);
    }

    #[test]
    fn inputs_are_checked() {
        let mut e = Expression::sum([
            Expression::typed_variable("n", VarKind::Int),
            Expression::typed_variable("b", VarKind::Bool),
        ]);
        assert!(matches!(
            e.evaluate(&Inputs::default()),
            Err(SymError::UnassignedSlot(_))
        ));
        e.put_indexes();
        assert!(matches!(
            e.evaluate(&Inputs::new(&[true], &[], &[])),
            Err(SymError::IndexOutOfRange {
                kind: VarKind::Int,
                ..
            })
        ));
        assert_eq!(e.evaluate(&Inputs::new(&[true], &[41], &[])).unwrap(), 42.0);
    }

    #[test]
    fn logarithms() {
        let mut e = Expression::log(Expression::variable("x"), Expression::integer(2));
        e.put_indexes();
        assert_eq!(e.evaluate(&Inputs::reals(&[8.0])).unwrap(), 8f64.ln() / 2f64.ln());
        let mut e = Expression::ln(Expression::variable("x"));
        e.put_indexes();
        assert_eq!(e.evaluate(&Inputs::reals(&[8.0])).unwrap(), 8f64.ln());
    }

    #[test]
    fn symbolic_evaluation_keeps_exact_kinds() {
        let n = Expression::typed_variable("n", VarKind::Int);
        let mut e = Expression::product([n.clone(), n, Expression::rational(1, 3).unwrap()]);
        e.put_indexes();
        let value = e.evaluate_sym(&Inputs::new(&[], &[3], &[])).unwrap();
        assert!(matches!(value.as_number(), Some(Number::Integer(3))));
    }

    #[test]
    fn symbolic_evaluation_folds_functions() {
        let mut e = rastrigin();
        e.put_indexes();
        let value = e.evaluate_sym(&Inputs::reals(&[0.0, 0.0])).unwrap();
        assert!(value.is_zero());
    }
}
