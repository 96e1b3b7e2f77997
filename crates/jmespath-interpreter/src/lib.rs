//! JMESPath interpreter
//!
//! Walks a parsed AST against a `Rcvar`, dispatching function calls through
//! the `Runtime` carried by the evaluation `Context`.

use jmespath_ast::{Ast, JmespathError, Rcvar, RuntimeError, Span, Spanned, Variable};
use std::collections::BTreeMap;
use tracing::trace;

pub mod functions;
pub mod runtime;

pub use runtime::{DEFAULT_RUNTIME, Expression, Runtime};

/// Result of evaluating an expression
pub type SearchResult = Result<Rcvar, JmespathError>;

/// Evaluation state shared by the interpreter and functions
pub struct Context<'a> {
    /// Source of the expression being evaluated
    pub expression: &'a str,
    /// Runtime used to resolve function calls
    pub runtime: &'a Runtime,
    /// Byte offset of the node being evaluated, used for error positions
    pub offset: usize,
}

impl<'a> Context<'a> {
    #[must_use]
    pub const fn new(expression: &'a str, runtime: &'a Runtime) -> Self {
        Self {
            expression,
            runtime,
            offset: 0,
        }
    }

    /// Build a runtime error positioned at the current offset
    #[must_use]
    pub fn error(&self, error: RuntimeError) -> JmespathError {
        JmespathError::runtime(self.expression, self.offset, error)
    }
}

/// Evaluate `node` against `data`
///
/// # Errors
///
/// Returns a runtime `JmespathError` for invalid slices and failing function calls
pub fn interpret(data: &Rcvar, node: &Spanned<Ast>, ctx: &mut Context<'_>) -> SearchResult {
    match &node.node {
        Ast::Identity => Ok(data.clone()),
        Ast::Field { name } => Ok(data.get_field(name)),
        Ast::Index { idx } => Ok(data.get_index(*idx)),
        Ast::Slice { start, stop, step } => interpret_slice(data, *start, *stop, *step, node.span, ctx),
        Ast::Literal { value } => Ok(value.clone()),
        Ast::Subexpr { lhs, rhs } => {
            let left = interpret(data, lhs, ctx)?;
            interpret(&left, rhs, ctx)
        }
        Ast::Projection { lhs, rhs } => interpret_projection(data, lhs, rhs, ctx),
        Ast::ObjectValues { node } => {
            let subject = interpret(data, node, ctx)?;
            Ok(subject.as_object().map_or_else(null, |members| {
                Rcvar::new(Variable::Array(members.values().cloned().collect()))
            }))
        }
        Ast::Flatten { node } => {
            let subject = interpret(data, node, ctx)?;
            Ok(subject.as_array().map_or_else(null, |values| Rcvar::new(flatten(values))))
        }
        Ast::Condition { predicate, then } => {
            let matched = interpret(data, predicate, ctx)?;
            if matched.is_truthy() {
                interpret(data, then, ctx)
            } else {
                Ok(null())
            }
        }
        Ast::Comparison {
            comparator,
            lhs,
            rhs,
        } => {
            let left = interpret(data, lhs, ctx)?;
            let right = interpret(data, rhs, ctx)?;
            Ok(left
                .compare(*comparator, &right)
                .map_or_else(null, |result| Rcvar::new(Variable::Bool(result))))
        }
        Ast::And { lhs, rhs } => {
            let left = interpret(data, lhs, ctx)?;
            if left.is_truthy() {
                interpret(data, rhs, ctx)
            } else {
                Ok(left)
            }
        }
        Ast::Or { lhs, rhs } => {
            let left = interpret(data, lhs, ctx)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                interpret(data, rhs, ctx)
            }
        }
        Ast::Not { node } => {
            let value = interpret(data, node, ctx)?;
            Ok(Rcvar::new(Variable::Bool(!value.is_truthy())))
        }
        Ast::MultiList { elements } => {
            if data.is_null() {
                return Ok(null());
            }
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(interpret(data, element, ctx)?);
            }
            Ok(Rcvar::new(Variable::Array(values)))
        }
        Ast::MultiHash { elements } => {
            if data.is_null() {
                return Ok(null());
            }
            let mut members = BTreeMap::new();
            for element in elements {
                members.insert(element.key.clone(), interpret(data, &element.value, ctx)?);
            }
            Ok(Rcvar::new(Variable::Object(members)))
        }
        Ast::Function { name, args } => interpret_function(data, name, args, node.span, ctx),
        Ast::Expref { ast } => Ok(Rcvar::new(Variable::Expref((**ast).clone()))),
    }
}

fn null() -> Rcvar {
    Rcvar::new(Variable::Null)
}

fn flatten(values: &[Rcvar]) -> Variable {
    let mut flattened = Vec::with_capacity(values.len());
    for value in values {
        match value.as_array() {
            Some(nested) => flattened.extend(nested.iter().cloned()),
            None => flattened.push(value.clone()),
        }
    }
    Variable::Array(flattened)
}

fn interpret_slice(
    data: &Rcvar,
    start: Option<i32>,
    stop: Option<i32>,
    step: i32,
    span: Span,
    ctx: &mut Context<'_>,
) -> SearchResult {
    if step == 0 {
        ctx.offset = span.start;
        return Err(ctx.error(RuntimeError::InvalidSlice));
    }
    Ok(data
        .slice(start, stop, step)
        .map_or_else(null, |values| Rcvar::new(Variable::Array(values))))
}

/// Apply `rhs` to every element of the array produced by `lhs`, dropping nulls
fn interpret_projection(
    data: &Rcvar,
    lhs: &Spanned<Ast>,
    rhs: &Spanned<Ast>,
    ctx: &mut Context<'_>,
) -> SearchResult {
    let left = interpret(data, lhs, ctx)?;
    let Some(values) = left.as_array() else {
        return Ok(null());
    };
    let mut projected = Vec::with_capacity(values.len());
    for value in values {
        let result = interpret(value, rhs, ctx)?;
        if !result.is_null() {
            projected.push(result);
        }
    }
    Ok(Rcvar::new(Variable::Array(projected)))
}

fn interpret_function(
    data: &Rcvar,
    name: &str,
    args: &[Spanned<Ast>],
    span: Span,
    ctx: &mut Context<'_>,
) -> SearchResult {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(interpret(data, arg, ctx)?);
    }

    ctx.offset = span.start;
    trace!(function = name, arity = values.len(), "invoking function");
    let runtime = ctx.runtime;
    match runtime.get_function(name) {
        Some(function) => function.evaluate(&values, ctx),
        None => Err(ctx.error(RuntimeError::UnknownFunction(name.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmespath_ast::ErrorReason;

    fn search(expression: &str, json: &str) -> SearchResult {
        let runtime = Runtime::with_builtins();
        let ast = jmespath_parser::parse(expression)?;
        let data = Rcvar::new(Variable::from_json(json).unwrap());
        let mut ctx = Context::new(expression, &runtime);
        interpret(&data, &ast, &mut ctx)
    }

    fn eval(expression: &str, json: &str) -> String {
        search(expression, json).unwrap().to_string()
    }

    #[test]
    fn test_field_and_subexpression() {
        assert_eq!(eval("foo.bar", r#"{"foo": {"bar": "baz"}}"#), r#""baz""#);
        assert_eq!(eval("foo.missing", r#"{"foo": {"bar": "baz"}}"#), "null");
        assert_eq!(eval("foo.bar", r#"{"foo": "text"}"#), "null");
    }

    #[test]
    fn test_index() {
        assert_eq!(eval("[0]", "[1, 2, 3]"), "1");
        assert_eq!(eval("[-1]", "[1, 2, 3]"), "3");
        assert_eq!(eval("[5]", "[1, 2, 3]"), "null");
        assert_eq!(eval("[0]", r#"{"a": 1}"#), "null");
    }

    #[test]
    fn test_slice() {
        assert_eq!(eval("[1:3]", "[0, 1, 2, 3]"), "[1,2]");
        assert_eq!(eval("[::-1]", "[0, 1, 2]"), "[2,1,0]");
        assert_eq!(eval("foo[:2].a", r#"{"foo": [{"a": 1}, {"a": 2}, {"a": 3}]}"#), "[1,2]");
        assert_eq!(eval("[1:]", r#"{"a": 1}"#), "null");
    }

    #[test]
    fn test_zero_step_slice_is_an_error() {
        let err = search("foo[::0]", r#"{"foo": [1]}"#).unwrap_err();
        assert_eq!(err.reason, ErrorReason::Runtime(RuntimeError::InvalidSlice));
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_list_projection_drops_nulls() {
        let data = r#"{"people": [{"name": "a"}, {"age": 1}, {"name": "b"}]}"#;
        assert_eq!(eval("people[*].name", data), r#"["a","b"]"#);
        assert_eq!(eval("people[*].name", r#"{"people": {"name": "a"}}"#), "null");
    }

    #[test]
    fn test_object_projection() {
        let data = r#"{"ops": {"a": {"n": 1}, "b": {"n": 2}, "c": {}}}"#;
        assert_eq!(eval("ops.*.n", data), "[1,2]");
        assert_eq!(eval("ops.*", r#"{"ops": [1]}"#), "null");
    }

    #[test]
    fn test_flatten() {
        assert_eq!(eval("[]", "[[1, 2], 3, [4, [5]]]"), "[1,2,3,4,[5]]");
        assert_eq!(eval("[][]", "[[1, [2]], [[3]]]"), "[1,2,3]");
        assert_eq!(eval("a[]", r#"{"a": "x"}"#), "null");
    }

    #[test]
    fn test_nested_projections() {
        let data = r#"{"reservations": [{"instances": [{"id": 1}, {"id": 2}]}, {"instances": [{"id": 3}]}]}"#;
        assert_eq!(eval("reservations[*].instances[*].id", data), "[[1,2],[3]]");
        assert_eq!(eval("reservations[].instances[].id", data), "[1,2,3]");
    }

    #[test]
    fn test_filter() {
        let data = r#"{"items": [{"n": 1, "k": "a"}, {"n": 5, "k": "b"}, {"n": 9, "k": "c"}]}"#;
        assert_eq!(eval("items[?n > `2`].k", data), r#"["b","c"]"#);
        assert_eq!(eval("items[?k == 'a'].n", data), "[1]");
        assert_eq!(eval("items[?n > `2` && n < `9`].k", data), r#"["b"]"#);
        assert_eq!(eval("items[?k > `1`]", data), "[]");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("a == b", r#"{"a": [1, {"x": 2}], "b": [1, {"x": 2}]}"#), "true");
        assert_eq!(eval("a != b", r#"{"a": 1, "b": "1"}"#), "true");
        assert_eq!(eval("a < b", r#"{"a": 1, "b": 2}"#), "true");
        assert_eq!(eval("a < b", r#"{"a": "a", "b": "b"}"#), "null");
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(eval("a || b", r#"{"a": [], "b": "x"}"#), r#""x""#);
        assert_eq!(eval("a || b", r#"{"a": "y", "b": "x"}"#), r#""y""#);
        assert_eq!(eval("a && b", r#"{"a": 0, "b": "x"}"#), r#""x""#);
        assert_eq!(eval("a && b", r#"{"a": "", "b": "x"}"#), r#""""#);
        assert_eq!(eval("!a", r#"{"a": {}}"#), "true");
        assert_eq!(eval("!a", r#"{"a": 0}"#), "false");
    }

    #[test]
    fn test_multi_select() {
        let data = r#"{"a": 1, "b": {"c": 2}}"#;
        assert_eq!(eval("[a, b.c, d]", data), "[1,2,null]");
        assert_eq!(eval("{x: a, y: b.c}", data), r#"{"x":1,"y":2}"#);
        assert_eq!(eval("missing.[a]", data), "null");
        assert_eq!(eval("missing.{a: a}", data), "null");
    }

    #[test]
    fn test_pipe_stops_projection() {
        let data = r#"{"foo": [{"bar": 1}, {"bar": 2}]}"#;
        assert_eq!(eval("foo[*].bar | [0]", data), "1");
        assert_eq!(eval("foo[*].bar[0]", data), "[]");
    }

    #[test]
    fn test_literals_and_identity() {
        assert_eq!(eval("`{\"a\": [true]}`", "null"), r#"{"a":[true]}"#);
        assert_eq!(eval("'raw'", "null"), r#""raw""#);
        assert_eq!(eval("@", "[1]"), "[1]");
    }

    #[test]
    fn test_expref_value() {
        let value = search("&foo", "{}").unwrap();
        assert!(value.is_expref());
    }

    #[test]
    fn test_unknown_function() {
        let err = search("foo | nope(@)", "{}").unwrap_err();
        assert_eq!(
            err.reason,
            ErrorReason::Runtime(RuntimeError::UnknownFunction("nope".to_string()))
        );
        assert_eq!(err.offset, 6);
        assert_eq!(err.column, 7);
    }
}
