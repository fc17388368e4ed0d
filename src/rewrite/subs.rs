use crate::error::SymResult;
use crate::expr::{Expression, FunctionKind, Node};
use crate::utils::Tree;

use super::collect::{collapse_product, collect_sum};
use super::small_power;

/// Replaces every occurrence of `pattern` by `replacement` and reports how
/// many replacements happened.
pub(crate) fn subs(expr: Expression, pattern: &Expression, replacement: &Expression) -> (Expression, usize) {
    let mut hits = 0;
    let out = subs_rec(expr, pattern, replacement, &mut hits);
    (out, hits)
}

fn subs_rec(
    mut expr: Expression,
    pattern: &Expression,
    replacement: &Expression,
    hits: &mut usize,
) -> Expression {
    if expr == *pattern {
        *hits += 1;
        return replacement.clone();
    }
    let multiset = match pattern.node() {
        Node::Sum(p) if expr.is_sum() => Some((p, true)),
        Node::Product(p) if expr.is_product() => Some((p, false)),
        _ => None,
    };
    if let Some((p, is_sum)) = multiset {
        return multiset_subs(expr, p, is_sum, replacement, pattern, hits);
    }
    for child in expr.children_mut() {
        *child = subs_rec(child.take(), pattern, replacement, hits);
    }
    expr
}

/// Finds how many disjoint copies of the `pattern` multiset occur among
/// `children`, and marks the children used by them.
fn find_matches(children: &[Expression], pattern: &[Expression]) -> (usize, Vec<bool>) {
    let mut needs: Vec<(&Expression, usize)> = Vec::new();
    for p in pattern {
        match needs.iter_mut().find(|(q, _)| *q == p) {
            Some((_, n)) => *n += 1,
            None => needs.push((p, 1)),
        }
    }
    let positions = needs
        .iter()
        .map(|(q, _)| {
            children
                .iter()
                .enumerate()
                .filter(|(_, c)| c == q)
                .map(|(i, _)| i)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let matches = needs
        .iter()
        .zip(&positions)
        .map(|((_, need), at)| at.len() / need)
        .min()
        .unwrap_or(0);

    let mut used = vec![false; children.len()];
    for ((_, need), at) in needs.iter().zip(&positions) {
        for &i in at.iter().take(need * matches) {
            used[i] = true;
        }
    }
    (matches, used)
}

/// `x^3` turns into `x*x*x` so that product patterns can match single
/// factors. `None` if there was nothing to unfold.
fn unfold_powers(factors: &[Expression]) -> Option<Vec<Expression>> {
    let mut unfolded = false;
    let mut out = Vec::with_capacity(factors.len());
    for factor in factors {
        match factor.as_function_of(FunctionKind::Pow) {
            Some(p) => match small_power(&p.args[1]) {
                Some(k) => {
                    unfolded = true;
                    out.extend((0..k).map(|_| p.args[0].clone()));
                }
                None => out.push(factor.clone()),
            },
            None => out.push(factor.clone()),
        }
    }
    unfolded.then_some(out)
}

fn multiset_subs(
    expr: Expression,
    pattern_children: &[Expression],
    is_sum: bool,
    replacement: &Expression,
    pattern: &Expression,
    hits: &mut usize,
) -> Expression {
    let original = expr.into_node().into_children();
    let unfolded = if is_sum { None } else { unfold_powers(&original) };
    let (matches, used) = find_matches(unfolded.as_ref().unwrap_or(&original), pattern_children);

    let rebuild = |children: Vec<Expression>| {
        if is_sum {
            Expression::sum(children)
        } else {
            Expression::product(children)
        }
    };

    if matches == 0 {
        let children = original
            .into_iter()
            .map(|c| subs_rec(c, pattern, replacement, hits))
            .collect();
        return rebuild(children);
    }

    *hits += matches;
    let children = unfolded.unwrap_or(original);
    let mut kept = children
        .into_iter()
        .zip(used)
        .filter(|(_, used)| !used)
        .map(|(c, _)| subs_rec(c, pattern, replacement, hits))
        .collect::<Vec<_>>();
    kept.extend((0..matches).map(|_| replacement.clone()));
    rebuild(kept)
}

/// Coefficient of `term` in `expr`.
///
/// A product gives its remaining factors if `term` occurs in it exactly once
/// and `0` otherwise. A sum gives the collected coefficients of its terms and
/// a number is divided by a numeric `term`.
pub(crate) fn coeff(expr: &Expression, term: &Expression) -> SymResult<Expression> {
    if expr == term {
        return Ok(Expression::integer(1));
    }
    match expr.node() {
        Node::Product(factors) => {
            let pattern = match term.node() {
                Node::Product(p) => p.as_slice(),
                _ => std::slice::from_ref(term),
            };
            let (matches, used) = find_matches(factors, pattern);
            if matches != 1 {
                return Ok(Expression::integer(0));
            }
            let rest = factors
                .iter()
                .zip(used)
                .filter(|(_, used)| !used)
                .map(|(f, _)| f.clone())
                .collect();
            Ok(collapse_product(rest))
        }
        Node::Sum(terms) => {
            let coefficients = terms
                .iter()
                .map(|t| coeff(t, term))
                .collect::<SymResult<Vec<_>>>()?;
            Ok(collect_sum(coefficients))
        }
        Node::Number(n) => match term.as_number() {
            Some(t) => Ok(Expression::number((*n / *t)?)),
            None => Ok(Expression::integer(0)),
        },
        _ => Ok(Expression::integer(0)),
    }
}
