use thiserror::Error;

use crate::expr::parse::ParseError;
use crate::expr::VarKind;

/// Everything that can go wrong while building, rewriting, evaluating or
/// compiling an [`Expression`](crate::Expression).
#[derive(Error, Debug)]
pub enum SymError {
    #[error("Expected a numeric operand but found: {0}")]
    NotNumeric(String),
    #[error("Numeric kinds cannot be combined here: {0}")]
    IncompatibleNumeric(String),
    /// Reserved for callers that bind inputs by name. Slot based evaluation
    /// reports short inputs as [`SymError::IndexOutOfRange`] instead.
    #[error("Input values do not fit the variables: {0}")]
    IncompatibleVector(String),
    #[error("Division by zero")]
    DivideByZero,
    #[error("Pattern {0} was not found")]
    NoMatch(String),
    #[error("{0} needs a concrete payload")]
    AbstractClass(String),
    #[error("Slot {slot} is out of range for the {kind} inputs of length {len}")]
    IndexOutOfRange { kind: VarKind, slot: usize, len: usize },
    #[error("Variable {0} has no slot, run put_indexes first")]
    UnassignedSlot(String),
    #[error("Nesting of {array} scratch levels exceeds the limit of {limit}")]
    NestingTooDeep { array: &'static str, limit: usize },
    #[error("Native compilation failed: {0}")]
    CompileFailure(String),
    #[error("Relocation of compiled code failed: {0}")]
    RelocationFailure(String),
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
    #[error("Could not parse the given term")]
    Parse(#[from] ParseError),
    #[error("Could not serialize to JSON")]
    Json(#[from] serde_json::Error),
    #[error("IO Error during file writing")]
    Io(#[from] std::io::Error),
}

pub type SymResult<T> = Result<T, SymError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_payload() {
        let e = SymError::IncompatibleVector("x".to_owned());
        assert_eq!(e.to_string(), "Input values do not fit the variables: x");
        let e = SymError::IndexOutOfRange {
            kind: VarKind::Real,
            slot: 2,
            len: 1,
        };
        assert!(e.to_string().contains("Slot 2"));
    }
}
