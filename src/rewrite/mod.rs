//! Algebraic rewriting: `simplify`, `expand`, `collect`, `subs` and `coeff`.
//!
//! Every pass exists twice, as `op(&mut self)` rewriting the tree in place and
//! as `op_ed(&self)` returning a rewritten copy. A failing pass leaves the tree
//! untouched.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::compare::identical;
use crate::conf::SimplifyConf;
use crate::error::{SymError, SymResult};
use crate::expr::{Expression, Node};
use crate::number::{Number, Rank};
use crate::utils::Tree;

mod collect;
mod expand;
mod functions;
mod subs;

/// Largest integer exponent that `expand` multiplies out and that product
/// patterns unfold into repeated factors.
pub const MAX_UNFOLDED_POWER: u32 = 64;

/// The exponent as a small integer `k >= 2` worth unfolding.
pub(crate) fn small_power(exponent: &Expression) -> Option<u32> {
    let n = exponent.as_number()?;
    if n.rank() == Rank::Real || !n.is_integral() {
        return None;
    }
    let k = u32::try_from(n.to_i64().ok()?).ok()?;
    (2..=MAX_UNFOLDED_POWER).contains(&k).then_some(k)
}

/// Named rewrite passes, for callers that pick them at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Pass {
    Simplify,
    Expand,
    Collect,
    Factor,
    Cancel,
    Appart,
    Trigsimp,
    ExpandTrig,
    Powsimp,
    Powdenest,
    ExpandPowerExp,
    ExpandPowerBase,
    ExpandLog,
    Logcombine,
}

// ============================================================================
// Simplification driver
// ============================================================================

/// The rewrite a single node proposes once its children are simplified.
fn local_rule(expr: &Expression) -> SymResult<Option<Expression>> {
    match expr.node() {
        Node::Number(n @ Number::Rational(_)) if n.is_integral() => {
            Ok(Some(Expression::number(n.demoted())))
        }
        Node::Sum(terms) => Ok(Some(collect::collect_sum(terms.clone()))),
        Node::Product(factors) => collect::collect_product(factors.clone()).map(Some),
        Node::Function(_) => functions::simplify_function(expr),
        _ => Ok(None),
    }
}

fn simplify_node(mut expr: Expression, conf: &SimplifyConf) -> SymResult<Expression> {
    for child in expr.children_mut() {
        *child = simplify_node(child.take(), conf)?;
    }
    let Some(new) = local_rule(&expr)? else {
        return Ok(expr);
    };
    if identical(&new, &expr) {
        return Ok(expr);
    }
    if !conf.accepts(&expr, &new) {
        debug!("Rewrite {expr} => {new} rejected, it grows past ratio {}", conf.ratio);
        return Ok(expr);
    }
    trace!("{expr} => {new}");
    simplify_node(new, conf)
}

// ============================================================================
// Public passes
// ============================================================================

impl Expression {
    /// Simplifies with the default ratio `1.7` and the operation count measure.
    ///
    /// Under these defaults a rewrite that adds an operation to a small node
    /// is rejected. In particular `log(x, b)` with a symbolic `x` and a
    /// numeric base stays as it is, since `ln(x)/ln(b)` needs two operations.
    /// Use [`SimplifyConf::unbounded`] with [`Expression::simplify_with`] to
    /// allow it.
    ///
    /// # Errors
    /// Fails if folding numbers hits a division by zero.
    pub fn simplify(&mut self) -> SymResult<&mut Self> {
        self.simplify_with(&SimplifyConf::default())
    }

    /// Bottom-up simplification. Children go first, then the node's own rules
    /// (rational demotion, `collect`, the function rules). A rewrite is kept
    /// only if `conf` accepts the growth it causes.
    ///
    /// # Errors
    /// Fails if folding numbers hits a division by zero.
    pub fn simplify_with(&mut self, conf: &SimplifyConf) -> SymResult<&mut Self> {
        *self = simplify_node(self.clone(), conf)?;
        Ok(self)
    }

    /// # Errors
    /// See [`Expression::simplify`].
    pub fn simplified(&self) -> SymResult<Expression> {
        simplify_node(self.clone(), &SimplifyConf::default())
    }

    /// # Errors
    /// See [`Expression::simplify`].
    pub fn simplified_with(&self, conf: &SimplifyConf) -> SymResult<Expression> {
        simplify_node(self.clone(), conf)
    }

    /// Distributes products over sums and expands powers of sums and
    /// products. Unbounded, see [`Expression::expand_with`].
    ///
    /// # Errors
    /// Never fails, the `Result` keeps the shape of the other passes.
    pub fn expand(&mut self) -> SymResult<&mut Self> {
        *self = expand::expand(self.clone());
        Ok(self)
    }

    /// # Errors
    /// See [`Expression::expand`].
    pub fn expanded(&self) -> SymResult<Expression> {
        Ok(expand::expand(self.clone()))
    }

    /// Expands only if the result passes the growth guard of `conf`.
    ///
    /// # Errors
    /// See [`Expression::expand`].
    pub fn expand_with(&mut self, conf: &SimplifyConf) -> SymResult<&mut Self> {
        let expanded = expand::expand(self.clone());
        if conf.accepts(self, &expanded) {
            *self = expanded;
        } else {
            debug!("Expansion of {self} rejected, it grows past ratio {}", conf.ratio);
        }
        Ok(self)
    }

    /// Merges like terms and like factors everywhere in the tree.
    ///
    /// # Errors
    /// Fails if folding numbers hits a division by zero.
    pub fn collect(&mut self) -> SymResult<&mut Self> {
        *self = collect::collect(self.clone())?;
        Ok(self)
    }

    /// # Errors
    /// See [`Expression::collect`].
    pub fn collected(&self) -> SymResult<Expression> {
        collect::collect(self.clone())
    }

    /// Replaces every occurrence of `pattern` by `replacement`.
    ///
    /// Sum and product patterns also match sub-multisets of larger sums and
    /// products, once per disjoint copy.
    pub fn subs(&mut self, pattern: &Expression, replacement: &Expression) -> &mut Self {
        let (out, _) = subs::subs(self.take(), pattern, replacement);
        *self = out;
        self
    }

    #[must_use]
    pub fn substituted(&self, pattern: &Expression, replacement: &Expression) -> Expression {
        subs::subs(self.clone(), pattern, replacement).0
    }

    /// Like [`Expression::subs`] but insists on at least one replacement.
    ///
    /// # Errors
    /// Fails with [`SymError::NoMatch`] if `pattern` does not occur.
    pub fn try_subs(&mut self, pattern: &Expression, replacement: &Expression) -> SymResult<&mut Self> {
        let (out, hits) = subs::subs(self.clone(), pattern, replacement);
        if hits == 0 {
            return Err(SymError::NoMatch(pattern.to_string()));
        }
        *self = out;
        Ok(self)
    }

    /// Substitutes the left side of the equation `lhs == rhs` by its right side.
    ///
    /// # Errors
    /// Fails with [`SymError::NoMatch`] if `statement` is not an equation.
    pub fn subs_statement(&mut self, statement: &Expression) -> SymResult<&mut Self> {
        match statement.as_statement() {
            Some(s) if statement.is_equation() => Ok(self.subs(s.lhs(), s.rhs())),
            _ => Err(SymError::NoMatch(format!("{statement} is not an equation"))),
        }
    }

    /// Applies [`Expression::subs_statement`] for each equation in order.
    ///
    /// # Errors
    /// Fails with [`SymError::NoMatch`] if one of them is not an equation, the
    /// tree is left unchanged then.
    pub fn subs_all(&mut self, statements: &[Expression]) -> SymResult<&mut Self> {
        let mut out = self.clone();
        for statement in statements {
            out.subs_statement(statement)?;
        }
        *self = out;
        Ok(self)
    }

    /// Coefficient of `term`, `0` if it does not occur or occurs more than
    /// once in a product.
    ///
    /// # Errors
    /// Fails with [`SymError::DivideByZero`] when a numeric coefficient is
    /// asked for the number zero.
    pub fn coeff(&self, term: &Expression) -> SymResult<Expression> {
        subs::coeff(self, term)
    }

    /// Coefficient of `term^n`. For `n = 0` this is the part that does not
    /// depend on `term`, found by substituting it with zero.
    ///
    /// # Errors
    /// See [`Expression::coeff`].
    pub fn coeff_pow(&self, term: &Expression, n: i64) -> SymResult<Expression> {
        match n {
            0 => self.substituted(term, &Expression::integer(0)).simplified(),
            1 => self.coeff(term),
            _ => self.coeff(&Expression::pow(term.clone(), Expression::integer(n))),
        }
    }

    /// Runs a pass by name and reports whether the tree changed.
    ///
    /// # Errors
    /// Propagates the errors of the pass.
    pub fn apply(&mut self, pass: Pass) -> SymResult<bool> {
        let before = self.clone();
        match pass {
            Pass::Simplify => self.simplify().map(|_| ())?,
            Pass::Expand => self.expand().map(|_| ())?,
            Pass::Collect => self.collect().map(|_| ())?,
            Pass::Powdenest => {
                self.powdenest();
            }
            Pass::ExpandPowerExp => {
                self.expand_power_exp();
            }
            Pass::ExpandPowerBase => {
                self.expand_power_base();
            }
            other => return Ok(self.unchanged(other)),
        }
        Ok(!identical(&before, self))
    }

    /// Merges nested powers, `(a^b)^c` becomes `a^(b*c)`. Nothing else is
    /// rewritten.
    pub fn powdenest(&mut self) -> &mut Self {
        *self = expand::rewrite_powers(self.take(), expand::denest);
        self
    }

    /// Splits powers of sums in the exponent, `a^(b+c)` becomes `a^b*a^c`.
    pub fn expand_power_exp(&mut self) -> &mut Self {
        *self = expand::rewrite_powers(self.take(), expand::power_exp);
        self
    }

    /// Splits powers of products, `(a*b)^c` becomes `a^c*b^c`.
    pub fn expand_power_base(&mut self) -> &mut Self {
        *self = expand::rewrite_powers(self.take(), expand::power_base);
        self
    }

    fn unchanged(&self, pass: Pass) -> bool {
        trace!("{pass} leaves {self} as it is");
        false
    }

    /// Factorization, not implemented. Always reports no change.
    pub fn factor(&mut self) -> bool {
        self.unchanged(Pass::Factor)
    }

    /// Cancellation of common factors in fractions, not implemented.
    pub fn cancel(&mut self) -> bool {
        self.unchanged(Pass::Cancel)
    }

    /// Partial fraction decomposition, not implemented.
    pub fn appart(&mut self) -> bool {
        self.unchanged(Pass::Appart)
    }

    pub fn trigsimp(&mut self) -> bool {
        self.unchanged(Pass::Trigsimp)
    }

    pub fn expand_trig(&mut self) -> bool {
        self.unchanged(Pass::ExpandTrig)
    }

    pub fn powsimp(&mut self) -> bool {
        self.unchanged(Pass::Powsimp)
    }

    pub fn expand_log(&mut self) -> bool {
        self.unchanged(Pass::ExpandLog)
    }

    pub fn logcombine(&mut self) -> bool {
        self.unchanged(Pass::Logcombine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::Measure;

    fn x() -> Expression {
        Expression::variable("x")
    }

    #[test]
    fn sum_of_integers_folds() {
        let mut e = Expression::sum([Expression::integer(10), Expression::integer(1)]);
        e.simplify().unwrap();
        assert!(matches!(e.as_number(), Some(Number::Integer(11))));
    }

    #[test]
    fn integral_rational_demotes() {
        let e = Expression::rational(6, 3).unwrap().simplified().unwrap();
        assert!(matches!(e.as_number(), Some(Number::Integer(2))));
        let e = Expression::rational(6, 4).unwrap().simplified().unwrap();
        assert_eq!(e.to_string(), "3/2");
    }

    #[test]
    fn rules_chain_after_collect() {
        // sin(x - x) only folds once the argument has collapsed to zero.
        let arg = Expression::sum([x(), Expression::product([Expression::integer(-1), x()])]);
        let e = Expression::sin(arg).simplified().unwrap();
        assert!(e.is_zero());
    }

    #[test]
    fn guard_rejects_growth() {
        let e = Expression::log(x(), Expression::integer(10));
        let strict = SimplifyConf::builder().ratio(1.0).build();
        assert_eq!(e.simplified_with(&strict).unwrap(), e);
        assert!(identical(&e.simplified().unwrap(), &e));
        let rewritten = e.simplified_with(&SimplifyConf::unbounded()).unwrap();
        assert!(rewritten.is_product());
        let by_nodes = SimplifyConf::builder().measure(Measure::NodeCount).build();
        assert!(e.simplified_with(&by_nodes).unwrap().is_product());
    }

    #[test]
    fn simplify_is_idempotent() {
        let e: Expression = "(+ (* 2 x) (pow x 2) (* x x) 3 (* -2 x) (sin (* -1 x)))"
            .parse()
            .unwrap();
        let once = e.simplified().unwrap();
        let twice = once.simplified().unwrap();
        assert!(identical(&once, &twice));
    }

    #[test]
    fn zero_base_wins_over_negative_exponent() {
        let e = Expression::pow(Expression::integer(0), Expression::integer(-1));
        assert!(e.simplified().unwrap().is_zero());
        let vanishing = Expression::sum([x(), Expression::product([Expression::integer(-1), x()])]);
        let e = Expression::product([
            Expression::integer(2),
            Expression::pow(vanishing, Expression::integer(-1)),
        ]);
        assert!(e.simplified().unwrap().is_zero());
    }

    #[test]
    fn numeric_division_by_zero_fails() {
        let e = Expression::sum([Expression::integer(1), Expression::integer(0)]);
        assert!(matches!(e.coeff(&Expression::integer(0)), Err(SymError::DivideByZero)));
    }

    #[test]
    fn expand_with_guards_the_root() {
        let (a, b) = (Expression::variable("a"), Expression::variable("b"));
        let mut e = Expression::pow(Expression::sum([a, b]), Expression::integer(4));
        let before = e.clone();
        e.expand_with(&SimplifyConf::default()).unwrap();
        assert!(identical(&e, &before));
        e.expand().unwrap();
        assert_eq!(e.len(), 16);
    }

    #[test]
    fn failed_try_subs_leaves_tree() {
        let mut e = Expression::sin(x());
        let y = Expression::variable("y");
        assert!(matches!(e.try_subs(&y, &x()), Err(SymError::NoMatch(_))));
        assert_eq!(e, Expression::sin(x()));
        e.try_subs(&x(), &y).unwrap();
        assert_eq!(e, Expression::sin(y));
    }

    #[test]
    fn statements_substitute() {
        let (y, z) = (Expression::variable("y"), Expression::variable("z"));
        let mut e = Expression::sum([x(), y.clone()]);
        e.subs_all(&[Expression::equal(x(), z.clone()), Expression::equal(y, Expression::integer(1))])
            .unwrap();
        assert_eq!(e, Expression::sum([z.clone(), Expression::integer(1)]));
        assert!(e.subs_statement(&Expression::less(z, x())).is_err());
    }

    #[test]
    fn coefficient_of_zeroth_power() {
        let e: Expression = "(+ (* 3 x) 2)".parse().unwrap();
        let c = e.coeff_pow(&x(), 0).unwrap();
        assert!(matches!(c.as_number(), Some(Number::Integer(2))));
        let e: Expression = "(+ (* 3 (pow x 2)) x)".parse().unwrap();
        assert!(matches!(
            e.coeff_pow(&x(), 2).unwrap().as_number(),
            Some(Number::Integer(3))
        ));
    }

    #[test]
    fn power_exponent_sums_split() {
        let (a, b) = (Expression::variable("a"), Expression::variable("b"));
        let mut e = Expression::pow(x(), Expression::sum([a.clone(), b.clone()]));
        e.expand_power_exp();
        assert_eq!(
            e,
            Expression::product([
                Expression::pow(x(), a.clone()),
                Expression::pow(x(), b.clone()),
            ])
        );
        let product_base = Expression::pow(Expression::product([a, b]), x());
        let mut untouched = product_base.clone();
        untouched.expand_power_exp();
        assert!(identical(&untouched, &product_base));
    }

    #[test]
    fn power_product_bases_split() {
        let (y, n) = (Expression::variable("y"), Expression::variable("n"));
        let mut e = Expression::sin(Expression::pow(
            Expression::product([x(), y.clone()]),
            n.clone(),
        ));
        e.expand_power_base();
        assert_eq!(
            e,
            Expression::sin(Expression::product([
                Expression::pow(x(), n.clone()),
                Expression::pow(y.clone(), n.clone()),
            ]))
        );
        let sum_exponent = Expression::pow(x(), Expression::sum([y, n]));
        let mut untouched = sum_exponent.clone();
        assert!(!untouched.apply(Pass::ExpandPowerBase).unwrap());
        assert!(identical(&untouched, &sum_exponent));
    }

    #[test]
    fn nested_powers_merge() {
        let mut e = Expression::pow(
            Expression::pow(Expression::pow(x(), Expression::integer(2)), Expression::integer(3)),
            Expression::integer(2),
        );
        assert!(e.apply(Pass::Powdenest).unwrap());
        assert_eq!(e, Expression::pow(x(), Expression::integer(12)));

        let (a, b) = (Expression::variable("a"), Expression::variable("b"));
        let mut e = Expression::pow(Expression::pow(x(), a.clone()), b.clone());
        e.powdenest();
        assert_eq!(e, Expression::pow(x(), Expression::product([a, b])));
        assert_eq!("powdenest".parse::<Pass>().unwrap(), Pass::Powdenest);
    }

    #[test]
    fn extension_points_report_no_change() {
        let mut e = Expression::sin(x());
        assert!(!e.factor());
        assert!(!e.trigsimp());
        assert!(!e.apply(Pass::Logcombine).unwrap());
        assert!(!e.apply("expand_log".parse().unwrap()).unwrap());
        let mut s = Expression::sum([x(), x()]);
        assert!(s.apply(Pass::Simplify).unwrap());
    }
}
