//! JMESPath, a query language for JSON
//!
//! Expressions are compiled once and searched against any data that
//! implements [`ToJmespath`]:
//!
//! ```
//! let expr = jmespath::compile("foo.bar | [0]").unwrap();
//! let data = jmespath::Variable::from_json(r#"{"foo": {"bar": [1, 2]}}"#).unwrap();
//! let result = expr.search(data).unwrap();
//! assert_eq!(result.as_number(), Some(1.0));
//! ```
//!
//! Custom functions are registered on a [`Runtime`]; [`compile`] uses the
//! shared [`DEFAULT_RUNTIME`] holding the built-in functions.

pub use jmespath_ast as ast;
pub use jmespath_ast::{
    ErrorReason, JmespathError, JmespathType, Rcvar, RuntimeError, ToJmespath, Variable,
};
pub use jmespath_interpreter::{
    Context, DEFAULT_RUNTIME, Expression, Runtime, SearchResult, functions, interpret,
};

/// Compile an expression using the default runtime
///
/// # Errors
///
/// Returns a parse `JmespathError` when the expression is invalid
pub fn compile(expression: &str) -> Result<Expression<'static>, JmespathError> {
    DEFAULT_RUNTIME.compile(expression)
}

/// Parse an expression into its AST without binding it to a runtime
///
/// # Errors
///
/// Returns a parse `JmespathError` when the expression is invalid
pub fn parse(expression: &str) -> Result<ast::Spanned<ast::Ast>, JmespathError> {
    jmespath_parser::parse(expression)
}

/// Compile and evaluate an expression in one step
///
/// # Errors
///
/// Returns parse, conversion and runtime errors
pub fn search<T: ToJmespath>(expression: &str, data: T) -> SearchResult {
    compile(expression)?.search(data)
}
