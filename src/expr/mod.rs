use std::mem;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, EnumString};

use crate::error::{SymError, SymResult};
use crate::number::Number;
use crate::utils::Tree;

mod display;
pub mod parse;
mod sugar;

/// Owning handle around one expression tree.
///
/// Cloning deep-copies the tree, moving hands it over. Equality and ordering
/// follow the canonical comparison in [`crate::compare`], not memory identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expression(Box<Node>);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Node {
    Number(Number),
    Variable(Variable),
    Constant(NamedConstant),
    Sum(Vec<Expression>),
    Product(Vec<Expression>),
    Function(Function),
    Statement(Statement),
}

impl Node {
    /// The children by value, leaves have none.
    #[must_use]
    pub fn into_children(self) -> Vec<Expression> {
        match self {
            Node::Number(_) | Node::Variable(_) | Node::Constant(_) => Vec::new(),
            Node::Sum(c) | Node::Product(c) => c,
            Node::Function(f) => f.args.into_vec(),
            Node::Statement(s) => Vec::from(s.sides),
        }
    }
}

/// Fixed order of node kinds used as the first key of the canonical compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Number,
    Variable,
    Constant,
    Sum,
    Product,
    Abs,
    Sin,
    Cos,
    Sinh,
    Cosh,
    Log,
    Pow,
    Statement,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum VarKind {
    Bool,
    Int,
    #[default]
    Real,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variable {
    pub(crate) name: String,
    pub(crate) kind: VarKind,
    pub(crate) slot: Option<usize>,
}

impl Variable {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> VarKind {
        self.kind
    }

    /// Slot in the input array of this variable's kind, set by
    /// [`Expression::put_indexes`].
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub(crate) fn set_slot(&mut self, slot: usize) {
        self.slot = Some(slot);
    }
}

/// A named symbol backed by a numeric value, like `pi` or `e`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamedConstant {
    pub(crate) name: String,
    pub(crate) value: Expression,
}

impl NamedConstant {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &Expression {
        &self.value
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum FunctionKind {
    Abs,
    Sin,
    Cos,
    Sinh,
    Cosh,
    Log,
    Pow,
}

impl FunctionKind {
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            FunctionKind::Log | FunctionKind::Pow => 2,
            _ => 1,
        }
    }

    fn node_kind(self) -> NodeKind {
        match self {
            FunctionKind::Abs => NodeKind::Abs,
            FunctionKind::Sin => NodeKind::Sin,
            FunctionKind::Cos => NodeKind::Cos,
            FunctionKind::Sinh => NodeKind::Sinh,
            FunctionKind::Cosh => NodeKind::Cosh,
            FunctionKind::Log => NodeKind::Log,
            FunctionKind::Pow => NodeKind::Pow,
        }
    }
}

/// A named function application.
///
/// `Log` holds `[argument, base]`, `Pow` holds `[base, exponent]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Function {
    pub(crate) kind: FunctionKind,
    pub(crate) args: SmallVec<[Expression; 2]>,
    pub(crate) commutative: bool,
}

impl Function {
    #[must_use]
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    #[must_use]
    pub fn args(&self) -> &[Expression] {
        &self.args
    }

    #[must_use]
    pub fn is_commutative(&self) -> bool {
        self.commutative
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
pub enum Relation {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

impl Relation {
    /// Only equality and inequality are symmetric in their sides.
    #[must_use]
    pub fn is_commutative(self) -> bool {
        matches!(self, Relation::Eq | Relation::Ne)
    }
}

/// `lhs <relation> rhs`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Statement {
    pub(crate) sides: [Expression; 2],
    pub(crate) relation: Relation,
}

impl Statement {
    #[must_use]
    pub fn lhs(&self) -> &Expression {
        &self.sides[0]
    }

    #[must_use]
    pub fn rhs(&self) -> &Expression {
        &self.sides[1]
    }

    #[must_use]
    pub fn relation(&self) -> Relation {
        self.relation
    }
}

/// Rough shape of an expression with respect to its variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FunctionType {
    Linear,
    NonLinear,
    Unknown,
}

// ============================================================================
// Construction
// ============================================================================

fn flattened(children: impl IntoIterator<Item = Expression>, sum: bool) -> Vec<Expression> {
    let mut out = Vec::new();
    for child in children {
        match *child.0 {
            Node::Sum(inner) if sum => out.extend(inner),
            Node::Product(inner) if !sum => out.extend(inner),
            node => out.push(Expression::new(node)),
        }
    }
    out
}

impl Expression {
    /// Wraps a node as is, without flattening.
    #[must_use]
    pub fn new(node: Node) -> Self {
        Expression(Box::new(node))
    }

    #[must_use]
    pub fn number(n: impl Into<Number>) -> Self {
        Expression::new(Node::Number(n.into()))
    }

    #[must_use]
    pub fn boolean(b: bool) -> Self {
        Expression::number(b)
    }

    #[must_use]
    pub fn integer(i: i64) -> Self {
        Expression::number(i)
    }

    #[must_use]
    pub fn real(f: f64) -> Self {
        Expression::number(f)
    }

    /// # Errors
    /// Fails with [`SymError::DivideByZero`] if `denom` is zero.
    pub fn rational(numer: i64, denom: i64) -> SymResult<Self> {
        Ok(Expression::number(Number::rational(numer, denom)?))
    }

    /// A real-valued variable.
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::typed_variable(name, VarKind::Real)
    }

    #[must_use]
    pub fn typed_variable(name: impl Into<String>, kind: VarKind) -> Self {
        Expression::new(Node::Variable(Variable {
            name: name.into(),
            kind,
            slot: None,
        }))
    }

    #[must_use]
    pub fn constant(name: impl Into<String>, value: Expression) -> Self {
        Expression::new(Node::Constant(NamedConstant {
            name: name.into(),
            value,
        }))
    }

    #[must_use]
    pub fn pi() -> Self {
        Expression::constant("pi", Expression::real(std::f64::consts::PI))
    }

    #[must_use]
    pub fn e() -> Self {
        Expression::constant("e", Expression::real(std::f64::consts::E))
    }

    /// The imaginary unit, backed by `(-1)^(1/2)`.
    #[must_use]
    pub fn imaginary_unit() -> Self {
        let half = Expression::pow(Expression::integer(2), Expression::integer(-1));
        Expression::constant("i", Expression::pow(Expression::integer(-1), half))
    }

    /// A sum, splicing in the terms of nested sums.
    #[must_use]
    pub fn sum(terms: impl IntoIterator<Item = Expression>) -> Self {
        Expression::new(Node::Sum(flattened(terms, true)))
    }

    /// A product, splicing in the factors of nested products.
    #[must_use]
    pub fn product(factors: impl IntoIterator<Item = Expression>) -> Self {
        Expression::new(Node::Product(flattened(factors, false)))
    }

    /// A function of the given kind.
    ///
    /// # Errors
    /// Fails with [`SymError::AbstractClass`] if the number of arguments does
    /// not match the kind.
    pub fn function(kind: FunctionKind, args: Vec<Expression>) -> SymResult<Self> {
        if args.len() != kind.arity() {
            return Err(SymError::AbstractClass(format!(
                "{kind} with {} arguments",
                args.len()
            )));
        }
        Ok(Expression::function_unchecked(kind, SmallVec::from_vec(args)))
    }

    pub(crate) fn function_unchecked(kind: FunctionKind, args: SmallVec<[Expression; 2]>) -> Self {
        Expression::new(Node::Function(Function {
            kind,
            args,
            commutative: false,
        }))
    }

    #[must_use]
    pub fn abs(x: Expression) -> Self {
        Expression::function_unchecked(FunctionKind::Abs, smallvec::smallvec![x])
    }

    #[must_use]
    pub fn sin(x: Expression) -> Self {
        Expression::function_unchecked(FunctionKind::Sin, smallvec::smallvec![x])
    }

    #[must_use]
    pub fn cos(x: Expression) -> Self {
        Expression::function_unchecked(FunctionKind::Cos, smallvec::smallvec![x])
    }

    #[must_use]
    pub fn sinh(x: Expression) -> Self {
        Expression::function_unchecked(FunctionKind::Sinh, smallvec::smallvec![x])
    }

    #[must_use]
    pub fn cosh(x: Expression) -> Self {
        Expression::function_unchecked(FunctionKind::Cosh, smallvec::smallvec![x])
    }

    /// Natural logarithm, a `Log` with base `e`.
    #[must_use]
    pub fn ln(x: Expression) -> Self {
        Expression::log(x, Expression::e())
    }

    #[must_use]
    pub fn log(x: Expression, base: Expression) -> Self {
        Expression::function_unchecked(FunctionKind::Log, smallvec::smallvec![x, base])
    }

    #[must_use]
    pub fn pow(base: Expression, exponent: Expression) -> Self {
        Expression::function_unchecked(FunctionKind::Pow, smallvec::smallvec![base, exponent])
    }

    #[must_use]
    pub fn statement(lhs: Expression, rhs: Expression, relation: Relation) -> Self {
        Expression::new(Node::Statement(Statement {
            sides: [lhs, rhs],
            relation,
        }))
    }

    #[must_use]
    pub fn equal(lhs: Expression, rhs: Expression) -> Self {
        Expression::statement(lhs, rhs, Relation::Eq)
    }

    #[must_use]
    pub fn not_equal(lhs: Expression, rhs: Expression) -> Self {
        Expression::statement(lhs, rhs, Relation::Ne)
    }

    #[must_use]
    pub fn less(lhs: Expression, rhs: Expression) -> Self {
        Expression::statement(lhs, rhs, Relation::Lt)
    }

    #[must_use]
    pub fn less_equal(lhs: Expression, rhs: Expression) -> Self {
        Expression::statement(lhs, rhs, Relation::Le)
    }

    #[must_use]
    pub fn greater(lhs: Expression, rhs: Expression) -> Self {
        Expression::statement(lhs, rhs, Relation::Gt)
    }

    #[must_use]
    pub fn greater_equal(lhs: Expression, rhs: Expression) -> Self {
        Expression::statement(lhs, rhs, Relation::Ge)
    }

    /// Flips the commutativity flag of a function node, other nodes are
    /// returned unchanged.
    #[must_use]
    pub fn toggle_commutative(mut self) -> Self {
        if let Node::Function(f) = self.0.as_mut() {
            f.commutative = !f.commutative;
        }
        self
    }
}

impl Default for Expression {
    fn default() -> Self {
        Expression::integer(0)
    }
}

impl From<Number> for Expression {
    fn from(n: Number) -> Self {
        Expression::number(n)
    }
}

impl From<bool> for Expression {
    fn from(b: bool) -> Self {
        Expression::boolean(b)
    }
}

impl From<i64> for Expression {
    fn from(i: i64) -> Self {
        Expression::integer(i)
    }
}

impl From<f64> for Expression {
    fn from(f: f64) -> Self {
        Expression::real(f)
    }
}

impl From<Node> for Expression {
    fn from(node: Node) -> Self {
        Expression::new(node)
    }
}

// ============================================================================
// Access and queries
// ============================================================================

impl Expression {
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.0
    }

    pub(crate) fn node_mut(&mut self) -> &mut Node {
        &mut self.0
    }

    #[must_use]
    pub fn into_node(self) -> Node {
        *self.0
    }

    /// Moves the tree out, leaving `Integer(0)` behind.
    pub(crate) fn take(&mut self) -> Expression {
        mem::take(self)
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self.node() {
            Node::Number(_) => NodeKind::Number,
            Node::Variable(_) => NodeKind::Variable,
            Node::Constant(_) => NodeKind::Constant,
            Node::Sum(_) => NodeKind::Sum,
            Node::Product(_) => NodeKind::Product,
            Node::Function(f) => f.kind.node_kind(),
            Node::Statement(_) => NodeKind::Statement,
        }
    }

    /// Number of direct terms, factors or arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }

    #[must_use]
    pub fn as_number(&self) -> Option<&Number> {
        match self.node() {
            Node::Number(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_variable(&self) -> Option<&Variable> {
        match self.node() {
            Node::Variable(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_function(&self) -> Option<&Function> {
        match self.node() {
            Node::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The function node if it is of the given kind.
    #[must_use]
    pub fn as_function_of(&self, kind: FunctionKind) -> Option<&Function> {
        self.as_function().filter(|f| f.kind == kind)
    }

    #[must_use]
    pub fn as_statement(&self) -> Option<&Statement> {
        match self.node() {
            Node::Statement(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self.node(), Node::Number(_))
    }

    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self.node(), Node::Variable(_))
    }

    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self.node(), Node::Constant(_))
    }

    #[must_use]
    pub fn is_sum(&self) -> bool {
        matches!(self.node(), Node::Sum(_))
    }

    #[must_use]
    pub fn is_product(&self) -> bool {
        matches!(self.node(), Node::Product(_))
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self.node(), Node::Function(_))
    }

    #[must_use]
    pub fn is_statement(&self) -> bool {
        matches!(self.node(), Node::Statement(_))
    }

    #[must_use]
    pub fn is_equation(&self) -> bool {
        self.as_statement()
            .is_some_and(|s| s.relation == Relation::Eq)
    }

    #[must_use]
    pub fn is_inequality(&self) -> bool {
        self.as_statement()
            .is_some_and(|s| s.relation != Relation::Eq)
    }

    /// Leaves: numbers, variables and constants.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.node(),
            Node::Number(_) | Node::Variable(_) | Node::Constant(_)
        )
    }

    /// The constant `e`, the default base of logarithms.
    #[must_use]
    pub fn is_euler(&self) -> bool {
        matches!(self.node(), Node::Constant(c) if c.name == "e")
    }

    /// Commutative nodes compare their children as multisets.
    #[must_use]
    pub fn is_commutative(&self) -> bool {
        match self.node() {
            Node::Sum(_) | Node::Product(_) => true,
            Node::Function(f) => f.commutative,
            Node::Statement(s) => s.relation.is_commutative(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_number().is_some_and(Number::is_zero)
    }

    #[must_use]
    pub fn is_one(&self) -> bool {
        self.as_number().is_some_and(Number::is_one)
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.as_number().is_some_and(Number::is_negative)
    }

    /// True if no variable occurs anywhere below this node.
    #[must_use]
    pub fn is_constant_valued(&self) -> bool {
        !self.is_variable() && self.children().iter().all(Expression::is_constant_valued)
    }

    /// The value of a number or named constant.
    ///
    /// # Errors
    /// Fails with [`SymError::NotNumeric`] for anything else.
    pub fn to_f64(&self) -> SymResult<f64> {
        match self.node() {
            Node::Number(n) => Ok(n.to_f64()),
            Node::Constant(c) => c.value.to_f64(),
            _ => Err(SymError::NotNumeric(self.to_string())),
        }
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.size()
    }

    /// Number of operations, that is internal nodes, in the tree.
    #[must_use]
    pub fn count_ops(&self) -> usize {
        if self.is_terminal() {
            0
        } else {
            1 + self.children().iter().map(Expression::count_ops).sum::<usize>()
        }
    }

    #[must_use]
    pub fn function_type(&self) -> FunctionType {
        match self.node() {
            Node::Number(_) | Node::Variable(_) | Node::Constant(_) => FunctionType::Linear,
            Node::Function(_) => {
                if self.is_constant_valued() {
                    FunctionType::Linear
                } else {
                    FunctionType::NonLinear
                }
            }
            Node::Sum(terms) => terms
                .iter()
                .map(Expression::function_type)
                .max()
                .unwrap_or(FunctionType::Linear),
            Node::Product(factors) => {
                let varying = factors.iter().filter(|f| !f.is_constant_valued()).count();
                let worst = factors
                    .iter()
                    .map(Expression::function_type)
                    .max()
                    .unwrap_or(FunctionType::Linear);
                if varying > 1 {
                    worst.max(FunctionType::NonLinear)
                } else {
                    worst
                }
            }
            Node::Statement(_) => FunctionType::Unknown,
        }
    }
}

impl Tree for Expression {
    fn children(&self) -> &[Self] {
        match self.node() {
            Node::Number(_) | Node::Variable(_) | Node::Constant(_) => &[],
            Node::Sum(c) | Node::Product(c) => c,
            Node::Function(f) => &f.args,
            Node::Statement(s) => &s.sides,
        }
    }

    fn children_mut(&mut self) -> &mut [Self] {
        match self.node_mut() {
            Node::Number(_) | Node::Variable(_) | Node::Constant(_) => &mut [],
            Node::Sum(c) | Node::Product(c) => c,
            Node::Function(f) => &mut f.args,
            Node::Statement(s) => &mut s.sides,
        }
    }
}

/// Hands out fresh variable names.
///
/// Each context numbers its own variables, so two contexts never interfere.
#[derive(Clone, Debug, Default)]
pub struct SymbolContext {
    next_variable: usize,
}

impl SymbolContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A variable named `x_{n}` that no earlier call of this context returned.
    pub fn fresh_variable(&mut self, kind: VarKind) -> Expression {
        self.next_variable += 1;
        Expression::typed_variable(format!("x_{{{}}}", self.next_variable), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expression {
        Expression::variable("x")
    }

    #[test]
    fn sums_flatten_on_construction() {
        let inner = Expression::sum([x(), Expression::integer(1)]);
        let outer = Expression::sum([inner, Expression::variable("y")]);
        assert_eq!(outer.len(), 3);
        assert!(outer.children().iter().all(|c| !c.is_sum()));
    }

    #[test]
    fn products_do_not_splice_sums() {
        let inner = Expression::sum([x(), Expression::integer(1)]);
        let outer = Expression::product([inner, x()]);
        assert_eq!(outer.len(), 2);
        assert!(outer.children()[0].is_sum());
    }

    #[test]
    fn function_arity_is_checked() {
        assert!(Expression::function(FunctionKind::Pow, vec![x()]).is_err());
        assert!(Expression::function(FunctionKind::Sin, vec![x()]).is_ok());
    }

    #[test]
    fn count_ops_counts_internal_nodes() {
        let e = Expression::sum([
            Expression::pow(x(), Expression::integer(2)),
            Expression::sin(x()),
        ]);
        assert_eq!(e.count_ops(), 3);
        assert_eq!(x().count_ops(), 0);
    }

    #[test]
    fn function_types() {
        let y = Expression::variable("y");
        let linear = Expression::sum([
            Expression::product([Expression::integer(2), x()]),
            y.clone(),
        ]);
        assert_eq!(linear.function_type(), FunctionType::Linear);
        assert_eq!(
            Expression::product([x(), y]).function_type(),
            FunctionType::NonLinear
        );
        assert_eq!(Expression::sin(x()).function_type(), FunctionType::NonLinear);
        assert_eq!(
            Expression::equal(x(), x()).function_type(),
            FunctionType::Unknown
        );
    }

    #[test]
    fn contexts_are_independent() {
        let mut a = SymbolContext::new();
        let mut b = SymbolContext::new();
        let first = a.fresh_variable(VarKind::Real);
        let second = a.fresh_variable(VarKind::Int);
        assert_eq!(first.as_variable().unwrap().name(), "x_{1}");
        assert_eq!(second.as_variable().unwrap().name(), "x_{2}");
        assert_eq!(b.fresh_variable(VarKind::Real).as_variable().unwrap().name(), "x_{1}");
    }

    #[test]
    fn toggling_commutativity() {
        let f = Expression::pow(x(), Expression::integer(2));
        assert!(!f.is_commutative());
        assert!(f.toggle_commutative().is_commutative());
    }
}
