use std::fmt;

use super::{logarithm, slack, unary, Arity, Inputs};
use crate::error::{SymError, SymResult};
use crate::expr::{Expression, FunctionKind, Node, VarKind};

type Closure = Box<dyn Fn(&Inputs<'_>) -> f64>;

fn closure(f: impl Fn(&Inputs<'_>) -> f64 + 'static) -> Closure {
    Box::new(f)
}

/// An expression turned into nested closures.
///
/// Calling it performs the floating point operations of
/// [`Expression::evaluate`] in the same order, without walking the tree.
pub struct Lambdified {
    root: Closure,
    arity: Arity,
}

impl Lambdified {
    #[must_use]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// # Errors
    /// Fails with [`SymError::IndexOutOfRange`] if an input array is shorter
    /// than the expression needs.
    pub fn call(&self, inputs: &Inputs<'_>) -> SymResult<f64> {
        self.arity.check(inputs)?;
        Ok((self.root)(inputs))
    }
}

impl fmt::Debug for Lambdified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lambdified")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

fn build(expr: &Expression) -> SymResult<Closure> {
    Ok(match expr.node() {
        Node::Number(n) => {
            let value = n.to_f64();
            closure(move |_| value)
        }
        Node::Variable(v) => {
            let slot = v
                .slot()
                .ok_or_else(|| SymError::UnassignedSlot(v.name().to_owned()))?;
            match v.kind() {
                VarKind::Bool => closure(move |i| f64::from(u8::from(i.bools[slot]))),
                VarKind::Int => closure(move |i| i.ints[slot] as f64),
                VarKind::Real => closure(move |i| i.reals[slot]),
            }
        }
        Node::Constant(c) => build(c.value())?,
        Node::Sum(terms) => {
            let terms = terms.iter().map(build).collect::<SymResult<Vec<_>>>()?;
            closure(move |i| {
                let mut acc = 0.0;
                for term in &terms {
                    acc += term(i);
                }
                acc
            })
        }
        Node::Product(factors) => {
            let factors = factors.iter().map(build).collect::<SymResult<Vec<_>>>()?;
            closure(move |i| {
                let mut acc = 1.0;
                for factor in &factors {
                    acc *= factor(i);
                }
                acc
            })
        }
        Node::Function(f) => {
            let args = f.args();
            let x = build(&args[0])?;
            if let Some(g) = unary(f.kind()) {
                closure(move |i| g(x(i)))
            } else if f.kind() == FunctionKind::Pow {
                let n = build(&args[1])?;
                closure(move |i| x(i).powf(n(i)))
            } else if args[1].is_euler() {
                closure(move |i| logarithm(x(i), None))
            } else {
                let b = build(&args[1])?;
                closure(move |i| logarithm(x(i), Some(b(i))))
            }
        }
        Node::Statement(s) => {
            let relation = s.relation();
            let lhs = build(s.lhs())?;
            let rhs = build(s.rhs())?;
            closure(move |i| slack(relation, lhs(i), rhs(i)))
        }
    })
}

impl Expression {
    /// Builds the closure form of this expression.
    ///
    /// # Errors
    /// Fails with [`SymError::UnassignedSlot`] if
    /// [`Expression::put_indexes`] has not run yet.
    pub fn lambdify(&self) -> SymResult<Lambdified> {
        let arity = Arity::of(self)?;
        Ok(Lambdified {
            root: build(self)?,
            arity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agrees_with_evaluate() {
        let mut e: Expression =
            "(+ (pow x 2) (* -3 (sinh y)) (abs (- n:int 7)) (log x 3) (cosh b:bool))"
                .parse()
                .unwrap();
        e.put_indexes();
        let f = e.lambdify().unwrap();
        for (x, y, n, b) in [(0.5, -1.0, 3, true), (2.0, 0.25, -9, false), (7.5, 3.0, 0, true)] {
            let bools = [b];
            let ints = [n];
            let reals = [x, y];
            let inputs = Inputs::new(&bools, &ints, &reals);
            assert_eq!(
                f.call(&inputs).unwrap().to_bits(),
                e.evaluate(&inputs).unwrap().to_bits()
            );
        }
    }

    #[test]
    fn checks_arity() {
        let mut e = Expression::product([Expression::variable("x"), Expression::variable("y")]);
        assert!(matches!(e.lambdify(), Err(SymError::UnassignedSlot(_))));
        e.put_indexes();
        let f = e.lambdify().unwrap();
        assert_eq!(f.arity().reals, 2);
        assert!(matches!(
            f.call(&Inputs::reals(&[1.0])),
            Err(SymError::IndexOutOfRange { .. })
        ));
        assert_eq!(f.call(&Inputs::reals(&[3.0, 4.0])).unwrap(), 12.0);
    }

    #[test]
    fn statements_give_slack() {
        let mut e = Expression::less_equal(Expression::variable("x"), Expression::integer(1));
        e.put_indexes();
        let f = e.lambdify().unwrap();
        assert_eq!(f.call(&Inputs::reals(&[0.25])).unwrap(), 0.75);
        assert_eq!(f.call(&Inputs::reals(&[3.0])).unwrap(), -2.0);
    }
}
