use std::ops;

use super::Expression;
use crate::arith;
use crate::error::SymResult;

impl ops::Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        arith::add(self, rhs)
    }
}

impl ops::Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        arith::sub(self, rhs)
    }
}

impl ops::Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        arith::mul(self, rhs)
    }
}

impl ops::Div for Expression {
    type Output = SymResult<Expression>;

    fn div(self, rhs: Expression) -> Self::Output {
        arith::div(self, rhs)
    }
}

impl ops::Rem for Expression {
    type Output = SymResult<Expression>;

    fn rem(self, rhs: Expression) -> Self::Output {
        arith::rem(self, rhs)
    }
}

impl ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        arith::neg(self)
    }
}

/// `!f` flips the commutativity of a function node.
impl ops::Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        self.toggle_commutative()
    }
}
