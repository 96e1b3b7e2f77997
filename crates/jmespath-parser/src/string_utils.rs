//! Token text decoding for the JMESPath parser
//!
//! Centralized handling of delimiter removal and escape processing for
//! quoted identifiers, raw strings, JSON literals and numbers.

use jmespath_ast::Variable;
use jmespath_lexer::{SpannedToken, Token};

/// Reasons token text could not be decoded
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid quoted identifier {text}: {reason}")]
    QuotedIdentifier { text: String, reason: String },

    #[error("Unable to parse literal JSON {text}: {reason}")]
    Literal { text: String, reason: String },

    #[error("Invalid number {0}")]
    Number(String),
}

/// Strip one leading and one trailing delimiter
fn strip_delimiters(text: &str, delimiter: char) -> &str {
    let inner = text.strip_prefix(delimiter).unwrap_or(text);
    inner.strip_suffix(delimiter).unwrap_or(inner)
}

/// Decode a quoted identifier using JSON string rules: `"foo\nbar"`
///
/// # Errors
///
/// Returns `DecodeError::QuotedIdentifier` for invalid escape sequences
pub fn unquote_identifier(text: &str) -> Result<String, DecodeError> {
    serde_json::from_str::<String>(text).map_err(|err| DecodeError::QuotedIdentifier {
        text: text.to_string(),
        reason: err.to_string(),
    })
}

/// Decode a raw string literal: only `\'` is an escape sequence
#[must_use]
pub fn unquote_raw_string(text: &str) -> String {
    strip_delimiters(text, '\'').replace("\\'", "'")
}

/// Decode a JSON literal enclosed in backticks
///
/// # Errors
///
/// Returns `DecodeError::Literal` when the enclosed text is not valid JSON
pub fn parse_literal(text: &str) -> Result<Variable, DecodeError> {
    let json = strip_delimiters(text, '`').replace("\\`", "`");
    Variable::from_json(json.trim()).map_err(|reason| DecodeError::Literal {
        text: text.to_string(),
        reason,
    })
}

/// Decode an index or slice component
///
/// # Errors
///
/// Returns `DecodeError::Number` when the value does not fit in an `i32`
pub fn parse_number(text: &str) -> Result<i32, DecodeError> {
    text.parse::<i32>()
        .map_err(|_| DecodeError::Number(text.to_string()))
}

/// Decode the name carried by an identifier token
///
/// # Errors
///
/// Propagates quoted identifier decoding failures
pub fn identifier_name(token: &SpannedToken) -> Result<String, DecodeError> {
    match token.token {
        Token::QuotedIdentifier => unquote_identifier(&token.text),
        _ => Ok(token.text.clone()),
    }
}
