//! Error types for the preprocessing pipeline.

use crate::position::Position;

/// A fatal preprocessing error, carrying the failure kind and the position
/// it was raised at. Renders as `FILE[line:L, col:C]: MESSAGE`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{pos}: {kind}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub pos: Position,
}

impl ParseError {
    pub fn new(kind: ErrorKind, pos: Position) -> Self {
        ParseError { kind, pos }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("Unexpected '{0}'")]
    Unexpected(char),
    #[error("Unexpected {0}")]
    UnexpectedToken(String),
    #[error("Expected {0}")]
    Expected(String),
    #[error("Unterminated comment")]
    UnterminatedComment,
    #[error("Unterminated string")]
    UnterminatedString,
    #[error("Unterminated raw string")]
    UnterminatedRawString,
    #[error("Invalid escape")]
    InvalidEscape,
    #[error("\\{0} escape not allowed")]
    EscapeNotAllowed(char),
    #[error("Unexpected #{0}")]
    UnexpectedDirective(&'static str),
    #[error("Unexpected __VA_ARGS__")]
    UnexpectedVaArgs,
    #[error("Too few args")]
    TooFewArgs,
    #[error("Too many args")]
    TooManyArgs,
    #[error("Divide by zero")]
    DivideByZero,
    #[error("Floating point number is not allowed")]
    FloatingPoint,
    #[error("Number out of range")]
    NumberOutOfRange,
}

impl ErrorKind {
    /// Shorthand for the pervasive "expected X, found Y" failures.
    pub fn expected(what: impl Into<String>) -> Self {
        ErrorKind::Expected(what.into())
    }

    pub fn at(self, pos: Position) -> ParseError {
        ParseError::new(self, pos)
    }
}
