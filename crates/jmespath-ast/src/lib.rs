//! Abstract Syntax Tree definitions for JMESPath
//!
//! Every AST node preserves location information for error reporting.

use std::fmt;

pub mod error;
pub mod variable;

pub use error::{ErrorReason, JmespathError, RuntimeError};
pub use variable::{JmespathType, Rcvar, ToJmespath, Variable};

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Line and column position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Convert byte offsets to line/column positions
///
/// Columns count characters, so a caret rendered under the source line
/// stays aligned after multibyte text.
pub struct SourceMap<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (pos, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(pos + 1);
            }
        }
        Self {
            source,
            line_starts,
        }
    }

    #[must_use]
    pub fn position(&self, byte_offset: usize) -> Position {
        match self.line_starts.binary_search(&byte_offset) {
            Ok(line) => Position::new(line + 1, 1),
            Err(line) => {
                let line_start = self.line_starts[line - 1];
                // Offsets past the end or inside a character fall back to bytes
                let column = self
                    .source
                    .get(line_start..byte_offset)
                    .map_or(byte_offset - line_start, |text| text.chars().count());
                Position::new(line, column + 1)
            }
        }
    }
}

/// AST node with location information
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    #[must_use]
    pub const fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Comparison operators usable in filters and comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
        };
        f.write_str(symbol)
    }
}

/// A JMESPath expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// The current node: `@`
    Identity,
    /// Object key lookup: `foo` or `"foo bar"`
    Field { name: String },
    /// Array index, negative counts from the end: `[-1]`
    Index { idx: i32 },
    /// Array slice: `[start:stop:step]`
    Slice {
        start: Option<i32>,
        stop: Option<i32>,
        step: i32,
    },
    /// JSON literal or raw string: `` `[1, 2]` ``, `'foo'`
    Literal { value: Rcvar },
    /// Evaluate `rhs` against the result of `lhs`: `foo.bar`, `foo | bar`
    Subexpr {
        lhs: Box<Spanned<Ast>>,
        rhs: Box<Spanned<Ast>>,
    },
    /// Apply `rhs` to every element of the array produced by `lhs`
    Projection {
        lhs: Box<Spanned<Ast>>,
        rhs: Box<Spanned<Ast>>,
    },
    /// Values of an object as an array: `*`
    ObjectValues { node: Box<Spanned<Ast>> },
    /// Merge one level of nested arrays: `[]`
    Flatten { node: Box<Spanned<Ast>> },
    /// Evaluate `then` when `predicate` is truthy, otherwise null
    Condition {
        predicate: Box<Spanned<Ast>>,
        then: Box<Spanned<Ast>>,
    },
    /// `lhs <op> rhs`
    Comparison {
        comparator: Comparator,
        lhs: Box<Spanned<Ast>>,
        rhs: Box<Spanned<Ast>>,
    },
    /// `lhs && rhs`
    And {
        lhs: Box<Spanned<Ast>>,
        rhs: Box<Spanned<Ast>>,
    },
    /// `lhs || rhs`
    Or {
        lhs: Box<Spanned<Ast>>,
        rhs: Box<Spanned<Ast>>,
    },
    /// `!node`
    Not { node: Box<Spanned<Ast>> },
    /// Multi-select list: `[a, b]`
    MultiList { elements: Vec<Spanned<Ast>> },
    /// Multi-select hash: `{a: a, b: b}`
    MultiHash { elements: Vec<KeyValuePair> },
    /// Function call: `length(foo)`
    Function {
        name: String,
        args: Vec<Spanned<Ast>>,
    },
    /// Expression reference passed to functions: `&foo`
    Expref { ast: Box<Spanned<Ast>> },
}

/// Key/value pair of a multi-select hash
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValuePair {
    pub key: String,
    pub value: Spanned<Ast>,
}

impl fmt::Display for Spanned<Ast> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#?}", self.node)
    }
}
