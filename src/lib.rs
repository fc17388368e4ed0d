#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::redundant_closure_for_method_calls,
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]

//! Symbolic expression trees over a small numeric tower.
//!
//! Expressions are built programmatically or parsed from s-expressions,
//! rewritten by [`Expression::simplify`] and friends, and evaluated either by
//! walking the tree, through closures ([`Expression::lambdify`]) or as native
//! code ([`Expression::compile`]).

pub mod arith;
pub mod compare;
mod conf;
mod error;
mod eval;
mod expr;
mod jit;
mod number;
mod rewrite;
mod utils;

type HashMap<K, V> = hashbrown::HashMap<K, V>;

pub use conf::{JitConf, Measure, OptLevel, SimplifyConf};
pub use error::{SymError, SymResult};
pub use eval::{slack, Arity, Inputs, Lambdified, SlotTables};
pub use expr::parse::ParseError;
pub use expr::{
    Expression, Function, FunctionKind, FunctionType, NamedConstant, Node, NodeKind, Relation,
    Statement, SymbolContext, VarKind, Variable,
};
pub use jit::{
    Compiled, CraneliftCompiler, Kernel, NativeCompiler, ENTRY, SCRATCH_LEVELS,
};
pub use number::{Number, Rank, Rational};
pub use rewrite::{Pass, MAX_UNFOLDED_POWER};
pub use utils::Tree;
