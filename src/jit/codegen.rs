//! Source text of the scalar program the native backends compile.
//!
//! The text is C-like: the math functions are declared `extern`, sums and
//! products accumulate in the scratch arrays `sum` and `prod`, one slot per
//! live nesting level, and the value comes back through `return`.

use std::fmt::Write;
use std::path::Path;

use log::debug;

use crate::error::{SymError, SymResult};
use crate::expr::{Expression, FunctionKind, Node, Relation, VarKind};

/// Number of slots of each scratch array.
pub const SCRATCH_LEVELS: usize = 5;

/// Name of the generated function.
pub const ENTRY: &str = "evaluate";

pub(crate) const EXTERNS: [(&str, usize); 7] = [
    ("sin", 1),
    ("cos", 1),
    ("sinh", 1),
    ("cosh", 1),
    ("log", 1),
    ("abs", 1),
    ("pow", 2),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Mark {
    sums: usize,
    prods: usize,
}

#[derive(Debug, Default)]
struct Emitter {
    body: String,
    sums: usize,
    prods: usize,
}

fn literal(value: f64) -> String {
    format!("{value:?}")
}

fn input(kind: VarKind, slot: usize) -> String {
    let array = match kind {
        VarKind::Bool => "bool_values",
        VarKind::Int => "int_values",
        VarKind::Real => "double_values",
    };
    format!("{array}[{slot}]")
}

impl Emitter {
    fn mark(&self) -> Mark {
        Mark {
            sums: self.sums,
            prods: self.prods,
        }
    }

    fn release(&mut self, mark: Mark) {
        self.sums = mark.sums;
        self.prods = mark.prods;
    }

    fn claim(level: &mut usize, array: &'static str) -> SymResult<usize> {
        if *level >= SCRATCH_LEVELS {
            return Err(SymError::NestingTooDeep {
                array,
                limit: SCRATCH_LEVELS,
            });
        }
        *level += 1;
        Ok(*level - 1)
    }

    fn line(&mut self, line: std::fmt::Arguments<'_>) {
        // Writing into a String cannot fail.
        let _ = writeln!(self.body, "    {line}");
    }

    /// Emits the statements `expr` needs and returns the value expression that
    /// reads its result. Scratch slots claimed here stay claimed until the
    /// caller releases them.
    fn emit(&mut self, expr: &Expression) -> SymResult<String> {
        Ok(match expr.node() {
            Node::Number(n) => literal(n.to_f64()),
            Node::Variable(v) => {
                let slot = v
                    .slot()
                    .ok_or_else(|| SymError::UnassignedSlot(v.name().to_owned()))?;
                input(v.kind(), slot)
            }
            Node::Constant(c) => literal(c.value().evaluate(&crate::eval::Inputs::default())?),
            Node::Sum(terms) => self.accumulate(terms, true)?,
            Node::Product(factors) => self.accumulate(factors, false)?,
            Node::Function(f) => {
                let args = f.args();
                let x = self.emit(&args[0])?;
                match f.kind() {
                    FunctionKind::Pow => format!("pow({x}, {})", self.emit(&args[1])?),
                    FunctionKind::Log if args[1].is_euler() => format!("log({x})"),
                    FunctionKind::Log => format!("(log({x}) / log({}))", self.emit(&args[1])?),
                    kind => format!("{kind}({x})"),
                }
            }
            Node::Statement(s) => {
                let lhs = self.emit(s.lhs())?;
                let rhs = self.emit(s.rhs())?;
                match s.relation() {
                    Relation::Eq => format!("abs({lhs} - {rhs})"),
                    Relation::Ne => format!("-abs({lhs} - {rhs})"),
                    Relation::Gt | Relation::Ge => format!("({lhs} - {rhs})"),
                    Relation::Lt | Relation::Le => format!("({rhs} - {lhs})"),
                }
            }
        })
    }

    fn accumulate(&mut self, children: &[Expression], sum: bool) -> SymResult<String> {
        let (array, level, identity, op) = if sum {
            ("sum", Self::claim(&mut self.sums, "sum")?, "0", "+=")
        } else {
            ("prod", Self::claim(&mut self.prods, "prod")?, "1", "*=")
        };
        self.line(format_args!("{array}[{level}] = {identity};"));
        for child in children {
            let mark = self.mark();
            let value = self.emit(child)?;
            self.line(format_args!("{array}[{level}] {op} {value};"));
            self.release(mark);
        }
        Ok(format!("{array}[{level}]"))
    }
}

impl Expression {
    /// The scalar program computing this expression, with the signature
    /// `double evaluate(_Bool bool_values[], long int_values[], double double_values[])`.
    ///
    /// # Errors
    /// Fails with [`SymError::UnassignedSlot`] before
    /// [`Expression::put_indexes`] ran and with [`SymError::NestingTooDeep`]
    /// if more than five sums or five products are live at once.
    pub fn c_code(&self) -> SymResult<String> {
        let mut emitter = Emitter::default();
        let value = emitter.emit(self)?;

        let mut code = String::new();
        for (name, arity) in EXTERNS {
            let params = vec!["double"; arity].join(", ");
            let _ = writeln!(code, "extern double {name}({params});");
        }
        let _ = writeln!(
            code,
            "\ndouble {ENTRY}(_Bool bool_values[], long int_values[], double double_values[]) {{"
        );
        let _ = writeln!(code, "    double sum[{SCRATCH_LEVELS}];");
        let _ = writeln!(code, "    double prod[{SCRATCH_LEVELS}];");
        code.push_str(&emitter.body);
        let _ = writeln!(code, "    return {value};\n}}");
        debug!("Generated {} lines of code", code.lines().count());
        Ok(code)
    }

    /// Writes [`Expression::c_code`] to `path`.
    ///
    /// # Errors
    /// Fails like [`Expression::c_code`] or if the file cannot be written.
    pub fn save_c_code(&self, path: impl AsRef<Path>) -> SymResult<()> {
        std::fs::write(path, self.c_code()?)?;
        Ok(())
    }
}
