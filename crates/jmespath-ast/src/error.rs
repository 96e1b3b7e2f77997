//! Error types with location information

use crate::SourceMap;

/// Error raised while parsing or evaluating an expression.
///
/// Carries the byte offset of the failing node together with the
/// line and column it maps to, so the message can point at the culprit.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{reason} (line {line}, column {column})\n{}", render_pointer(.expression, .line, .column))]
pub struct JmespathError {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub expression: String,
    pub reason: ErrorReason,
}

impl JmespathError {
    #[must_use]
    pub fn new(expression: &str, offset: usize, reason: ErrorReason) -> Self {
        let pos = SourceMap::new(expression).position(offset);
        Self {
            offset,
            line: pos.line,
            column: pos.column,
            expression: expression.to_string(),
            reason,
        }
    }

    #[must_use]
    pub fn parse(expression: &str, offset: usize, message: impl Into<String>) -> Self {
        Self::new(expression, offset, ErrorReason::Parse(message.into()))
    }

    #[must_use]
    pub fn runtime(expression: &str, offset: usize, error: RuntimeError) -> Self {
        Self::new(expression, offset, ErrorReason::Runtime(error))
    }

    /// Conversion failures happen before any expression is involved.
    #[must_use]
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new("", 0, ErrorReason::Conversion(message.into()))
    }
}

fn render_pointer(expression: &str, line: &usize, column: &usize) -> String {
    let source_line = expression.lines().nth(line.saturating_sub(1)).unwrap_or("");
    format!("{source_line}\n{}^", " ".repeat(column.saturating_sub(1)))
}

/// Why an expression failed
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ErrorReason {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Runtime error: {0}")]
    Runtime(RuntimeError),

    #[error("Conversion error: {0}")]
    Conversion(String),
}

/// Errors raised while evaluating a compiled expression
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Too many arguments: expected {expected}, found {actual}")]
    TooManyArguments { expected: usize, actual: usize },

    #[error("Not enough arguments: expected {expected}, found {actual}")]
    NotEnoughArguments { expected: usize, actual: usize },

    #[error("Argument {position} expects type {expected}, given {actual}")]
    InvalidType {
        expected: String,
        actual: String,
        position: usize,
    },

    #[error("Invalid slice: step cannot be 0")]
    InvalidSlice,

    #[error(
        "Argument {position} must return {expected} but invocation {invocation} returned {actual}"
    )]
    InvalidReturnType {
        expected: String,
        actual: String,
        position: usize,
        invocation: usize,
    },

    #[error("Call to undefined function {0}")]
    UnknownFunction(String),
}
