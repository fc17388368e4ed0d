//! Parser for the scalar programs produced by [`Expression::c_code`].
//!
//! Only the subset the generator emits is understood: `extern` declarations
//! of `double` functions, one entry function over the three input arrays,
//! fixed-size `double` scratch arrays, assignments with `=`, `+=` and `*=`,
//! and a final `return`.
//!
//! [`Expression::c_code`]: crate::Expression::c_code

use thiserror::Error;

use crate::expr::VarKind;

#[derive(Debug, Error, PartialEq)]
pub enum ProgramError {
    #[error("Unexpected character {0:?} at byte {1}")]
    BadChar(char, usize),
    #[error("Expected {expected} but found {found}")]
    Unexpected { expected: String, found: String },
    #[error("Unexpected end of input, expected {0}")]
    Eof(String),
    #[error("Bad number literal {0}")]
    BadNumber(String),
    #[error("Unknown parameter type {0}")]
    BadType(String),
    #[error("Unknown array {0}")]
    UnknownArray(String),
    #[error("Function {0} is not declared")]
    Undeclared(String),
    #[error("Function {name} takes {expected} arguments, {found} given")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Punct(&'static str),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) | Token::Number(s) => write!(f, "{s}"),
            Token::Punct(p) => write!(f, "{p}"),
        }
    }
}

const PUNCTS: [&str; 15] = [
    "+=", "*=", "(", ")", "[", "]", "{", "}", ",", ";", "=", "+", "-", "*", "/",
];

fn tokenize(source: &str) -> Result<Vec<Token>, ProgramError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token::Ident(source[start..i].to_owned()));
        } else if c.is_ascii_digit() || c == b'.' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                i += 1;
                if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                    i += 1;
                }
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            tokens.push(Token::Number(source[start..i].to_owned()));
        } else if let Some(p) = PUNCTS.iter().find(|p| source[i..].starts_with(**p)) {
            tokens.push(Token::Punct(*p));
            i += p.len();
        } else {
            let bad = source[i..].chars().next().unwrap_or('?');
            return Err(ProgramError::BadChar(bad, i));
        }
    }
    Ok(tokens)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Expr {
    Literal(f64),
    Input(VarKind, usize),
    Cell(String, usize),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AssignOp {
    Set,
    Add,
    Mul,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Assign {
    pub(crate) array: String,
    pub(crate) index: usize,
    pub(crate) op: AssignOp,
    pub(crate) value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Program {
    /// Declared functions with their number of arguments.
    pub(crate) externs: Vec<(String, usize)>,
    pub(crate) name: String,
    /// Input array parameters in declaration order.
    pub(crate) params: Vec<(String, VarKind)>,
    /// Scratch arrays with their length.
    pub(crate) scratch: Vec<(String, usize)>,
    pub(crate) body: Vec<Assign>,
    pub(crate) ret: Expr,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    externs: Vec<(String, usize)>,
    params: Vec<(String, VarKind)>,
    scratch: Vec<(String, usize)>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self, expected: &str) -> Result<Token, ProgramError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ProgramError::Eof(expected.to_owned()))?;
        self.pos += 1;
        Ok(token)
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(q)) if *q == p)
    }

    fn is_ident(&self, s: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(t)) if t == s)
    }

    fn punct(&mut self, p: &str) -> Result<(), ProgramError> {
        match self.next(p)? {
            Token::Punct(q) if q == p => Ok(()),
            other => Err(ProgramError::Unexpected {
                expected: p.to_owned(),
                found: other.to_string(),
            }),
        }
    }

    fn ident(&mut self) -> Result<String, ProgramError> {
        match self.next("an identifier")? {
            Token::Ident(s) => Ok(s),
            other => Err(ProgramError::Unexpected {
                expected: "an identifier".to_owned(),
                found: other.to_string(),
            }),
        }
    }

    fn keyword(&mut self, word: &str) -> Result<(), ProgramError> {
        let found = self.ident()?;
        if found == word {
            Ok(())
        } else {
            Err(ProgramError::Unexpected {
                expected: word.to_owned(),
                found,
            })
        }
    }

    fn index(&mut self) -> Result<usize, ProgramError> {
        self.punct("[")?;
        let index = match self.next("an index")? {
            Token::Number(n) => n.parse::<usize>().map_err(|_| ProgramError::BadNumber(n))?,
            other => {
                return Err(ProgramError::Unexpected {
                    expected: "an index".to_owned(),
                    found: other.to_string(),
                })
            }
        };
        self.punct("]")?;
        Ok(index)
    }

    fn program(mut self) -> Result<Program, ProgramError> {
        while self.is_ident("extern") {
            self.pos += 1;
            self.keyword("double")?;
            let name = self.ident()?;
            self.punct("(")?;
            let mut arity = 0;
            while !self.is_punct(")") {
                if arity > 0 {
                    self.punct(",")?;
                }
                self.keyword("double")?;
                arity += 1;
            }
            self.punct(")")?;
            self.punct(";")?;
            self.externs.push((name, arity));
        }

        self.keyword("double")?;
        let name = self.ident()?;
        self.punct("(")?;
        while !self.is_punct(")") {
            if !self.params.is_empty() {
                self.punct(",")?;
            }
            self.param()?;
        }
        self.punct(")")?;
        self.punct("{")?;

        while self.is_ident("double") {
            self.pos += 1;
            let array = self.ident()?;
            let len = self.index()?;
            self.punct(";")?;
            self.scratch.push((array, len));
        }

        let mut body = Vec::new();
        while !self.is_ident("return") {
            body.push(self.assign()?);
        }
        self.pos += 1;
        let ret = self.expr()?;
        self.punct(";")?;
        self.punct("}")?;
        if let Some(extra) = self.peek() {
            return Err(ProgramError::Unexpected {
                expected: "end of input".to_owned(),
                found: extra.to_string(),
            });
        }

        Ok(Program {
            externs: self.externs,
            name,
            params: self.params,
            scratch: self.scratch,
            body,
            ret,
        })
    }

    fn param(&mut self) -> Result<(), ProgramError> {
        let kind = match self.ident()?.as_str() {
            "_Bool" => VarKind::Bool,
            "long" => {
                if self.is_ident("int") {
                    self.pos += 1;
                }
                VarKind::Int
            }
            "double" => VarKind::Real,
            other => return Err(ProgramError::BadType(other.to_owned())),
        };
        let name = self.ident()?;
        self.punct("[")?;
        self.punct("]")?;
        self.params.push((name, kind));
        Ok(())
    }

    fn assign(&mut self) -> Result<Assign, ProgramError> {
        let array = self.ident()?;
        if !self.scratch.iter().any(|(s, _)| *s == array) {
            return Err(ProgramError::UnknownArray(array));
        }
        let index = self.index()?;
        let op = match self.next("an assignment")? {
            Token::Punct("=") => AssignOp::Set,
            Token::Punct("+=") => AssignOp::Add,
            Token::Punct("*=") => AssignOp::Mul,
            other => {
                return Err(ProgramError::Unexpected {
                    expected: "an assignment".to_owned(),
                    found: other.to_string(),
                })
            }
        };
        let value = self.expr()?;
        self.punct(";")?;
        Ok(Assign {
            array,
            index,
            op,
            value,
        })
    }

    fn expr(&mut self) -> Result<Expr, ProgramError> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.is_punct("+") {
                BinOp::Add
            } else if self.is_punct("-") {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, ProgramError> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.is_punct("*") {
                BinOp::Mul
            } else if self.is_punct("/") {
                BinOp::Div
            } else {
                return Ok(lhs);
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, ProgramError> {
        if self.is_punct("-") {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ProgramError> {
        match self.next("an operand")? {
            Token::Number(n) => n
                .parse::<f64>()
                .map(Expr::Literal)
                .map_err(|_| ProgramError::BadNumber(n)),
            Token::Punct("(") => {
                let inner = self.expr()?;
                self.punct(")")?;
                Ok(inner)
            }
            Token::Ident(name) if name == "inf" => Ok(Expr::Literal(f64::INFINITY)),
            Token::Ident(name) if name == "NaN" => Ok(Expr::Literal(f64::NAN)),
            Token::Ident(name) if self.is_punct("(") => self.call(name),
            Token::Ident(name) if self.is_punct("[") => {
                let index = self.index()?;
                if let Some((_, kind)) = self.params.iter().find(|(p, _)| *p == name) {
                    Ok(Expr::Input(*kind, index))
                } else if self.scratch.iter().any(|(s, _)| *s == name) {
                    Ok(Expr::Cell(name, index))
                } else {
                    Err(ProgramError::UnknownArray(name))
                }
            }
            other => Err(ProgramError::Unexpected {
                expected: "an operand".to_owned(),
                found: other.to_string(),
            }),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, ProgramError> {
        self.punct("(")?;
        let mut args = Vec::new();
        while !self.is_punct(")") {
            if !args.is_empty() {
                self.punct(",")?;
            }
            args.push(self.expr()?);
        }
        self.punct(")")?;
        let expected = self
            .externs
            .iter()
            .find(|(e, _)| *e == name)
            .map(|(_, arity)| *arity)
            .ok_or_else(|| ProgramError::Undeclared(name.clone()))?;
        if expected != args.len() {
            return Err(ProgramError::Arity {
                name,
                expected,
                found: args.len(),
            });
        }
        Ok(Expr::Call(name, args))
    }
}

/// Parses a generated scalar program.
///
/// # Errors
/// Fails with a [`ProgramError`] describing the first thing that does not fit
/// the grammar.
pub(crate) fn parse(source: &str) -> Result<Program, ProgramError> {
    let parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        externs: Vec::new(),
        params: Vec::new(),
        scratch: Vec::new(),
    };
    parser.program()
}
