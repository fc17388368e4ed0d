use std::str::FromStr;

use symbolic_expressions::{Sexp, SexpError};
use thiserror::Error;

use super::{Expression, FunctionKind, Relation, VarKind};
use crate::number::Number;

/// Reads expressions from s-expressions such as
/// `(+ (pow x 2) (* -10 (cos (* 2 pi x))) 10)`.
///
/// Atoms are numbers (`3`, `2.5`, `3/4`, `true`), the constants `pi`, `e` and
/// `i`, and variables (`x`, or with a kind `n:int`, `b:bool`, `y:real`).
/// The parser only builds structure, nothing is folded or simplified.
impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, ParseError> {
        let sexp = symbolic_expressions::parser::parse_str(s.trim()).map_err(ParseError::BadSexp)?;
        from_sexp(&sexp)
    }
}

fn from_sexp(sexp: &Sexp) -> Result<Expression, ParseError> {
    match sexp {
        Sexp::Empty => Err(ParseError::EmptySexp),
        Sexp::String(atom) => parse_atom(atom),
        Sexp::List(list) => match list.split_first() {
            None => Err(ParseError::EmptySexp),
            Some((Sexp::String(head), rest)) => {
                let args = rest.iter().map(from_sexp).collect::<Result<Vec<_>, _>>()?;
                apply(head, args)
            }
            Some((head, _)) => Err(ParseError::HeadList(head.to_owned())),
        },
    }
}

fn parse_atom(atom: &str) -> Result<Expression, ParseError> {
    match atom {
        "true" => return Ok(Expression::boolean(true)),
        "false" => return Ok(Expression::boolean(false)),
        "pi" => return Ok(Expression::pi()),
        "e" => return Ok(Expression::e()),
        "i" => return Ok(Expression::imaginary_unit()),
        _ => {}
    }
    if let Ok(i) = atom.parse::<i64>() {
        return Ok(Expression::integer(i));
    }
    if let Some((numer, denom)) = atom.split_once('/') {
        if let (Ok(numer), Ok(denom)) = (numer.parse::<i64>(), denom.parse::<i64>()) {
            return Number::rational(numer, denom)
                .map(Expression::number)
                .map_err(|_| ParseError::BadNumber(atom.to_owned()));
        }
    }
    if let Ok(f) = atom.parse::<f64>() {
        return Ok(Expression::real(f));
    }
    if let Some((name, kind)) = atom.split_once(':') {
        let kind = VarKind::from_str(kind).map_err(|_| ParseError::BadKind(atom.to_owned()))?;
        return Ok(Expression::typed_variable(name, kind));
    }
    if atom.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        Ok(Expression::variable(atom))
    } else {
        Err(ParseError::BadNumber(atom.to_owned()))
    }
}

fn exactly<const N: usize>(head: &str, args: Vec<Expression>) -> Result<[Expression; N], ParseError> {
    let found = args.len();
    <[Expression; N]>::try_from(args).map_err(|_| ParseError::Arity {
        head: head.to_owned(),
        found,
    })
}

fn minus(x: Expression) -> Expression {
    Expression::product([Expression::integer(-1), x])
}

fn reciprocal(x: Expression) -> Expression {
    Expression::pow(x, Expression::integer(-1))
}

fn apply(head: &str, args: Vec<Expression>) -> Result<Expression, ParseError> {
    match head {
        "+" | "*" if args.is_empty() => Err(ParseError::Arity {
            head: head.to_owned(),
            found: 0,
        }),
        "+" => Ok(Expression::sum(args)),
        "*" => Ok(Expression::product(args)),
        "-" if args.len() == 1 => {
            let [x] = exactly(head, args)?;
            Ok(minus(x))
        }
        "-" => {
            let [a, b] = exactly(head, args)?;
            Ok(Expression::sum([a, minus(b)]))
        }
        "/" => {
            let [a, b] = exactly(head, args)?;
            Ok(Expression::product([a, reciprocal(b)]))
        }
        "pow" | "^" => {
            let [b, n] = exactly(head, args)?;
            Ok(Expression::pow(b, n))
        }
        "log" if args.len() == 1 => {
            let [x] = exactly(head, args)?;
            Ok(Expression::ln(x))
        }
        "log" => {
            let [x, base] = exactly(head, args)?;
            Ok(Expression::log(x, base))
        }
        "ln" => {
            let [x] = exactly(head, args)?;
            Ok(Expression::ln(x))
        }
        "exp" => {
            let [x] = exactly(head, args)?;
            Ok(Expression::pow(Expression::e(), x))
        }
        "sqrt" => {
            let [x] = exactly(head, args)?;
            let half = Number::rational(1, 2).map_err(|_| ParseError::BadNumber("1/2".into()))?;
            Ok(Expression::pow(x, Expression::number(half)))
        }
        "tan" => {
            let [x] = exactly(head, args)?;
            Ok(Expression::product([
                Expression::sin(x.clone()),
                reciprocal(Expression::cos(x)),
            ]))
        }
        _ => {
            if let Ok(relation) = Relation::from_str(head) {
                let [lhs, rhs] = exactly(head, args)?;
                return Ok(Expression::statement(lhs, rhs, relation));
            }
            let kind = FunctionKind::from_str(head)
                .map_err(|_| ParseError::UnknownHead(head.to_owned()))?;
            Expression::function(kind, args).map_err(|_| ParseError::Arity {
                head: head.to_owned(),
                found: kind.arity(),
            })
        }
    }
}

/// An error type for failures when attempting to parse an s-expression as an
/// [`Expression`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// An empty s-expression was found. Usually this is caused by an
    /// empty list "()" somewhere in the input.
    #[error("found empty s-expression")]
    EmptySexp,

    /// A list was found where an operator was expected. This is caused by
    /// s-expressions of the form "((a b c) d e f)."
    #[error("found a list in the head position: {0}")]
    HeadList(Sexp),

    #[error("unknown operator {0}")]
    UnknownHead(String),

    #[error("{head} cannot take {found} arguments")]
    Arity { head: String, found: usize },

    #[error("malformed number {0}")]
    BadNumber(String),

    #[error("unknown variable kind in {0}")]
    BadKind(String),

    /// An error occurred while parsing the s-expression itself, generally
    /// because the input had an invalid structure (e.g. unpaired parentheses).
    #[error(transparent)]
    BadSexp(SexpError),
}
