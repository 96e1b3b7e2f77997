//! Integration tests for the function registry
//! Custom runtimes, user functions and exprefs across crate boundaries

use jmespath::functions::{ArgumentType, CustomFunction, Function, Signature};
use jmespath::{
    Context, ErrorReason, Rcvar, Runtime, RuntimeError, SearchResult, Variable, interpret,
};

/// Applies an expref to every value of an object
struct MapValues;

impl Function for MapValues {
    fn evaluate(&self, args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
        let signature = Signature::new(
            vec![ArgumentType::Expref, ArgumentType::Object],
            None,
            ArgumentType::Object,
        );
        signature.validate(args, ctx)?;

        let (Some(ast), Some(members)) = (args[0].as_expref(), args[1].as_object()) else {
            return Ok(Rcvar::new(Variable::Null));
        };
        let mut mapped = std::collections::BTreeMap::new();
        for (key, value) in members {
            mapped.insert(key.clone(), interpret(value, ast, ctx)?);
        }
        Ok(Rcvar::new(Variable::Object(mapped)))
    }
}

fn runtime() -> Runtime {
    let mut runtime = Runtime::with_builtins();
    runtime.register_function("map_values", Box::new(MapValues));
    runtime.register_function(
        "upper",
        Box::new(CustomFunction::new(
            Signature::new(vec![ArgumentType::String], None, ArgumentType::String),
            Box::new(|args: &[Rcvar], _ctx: &mut Context<'_>| {
                let upper = args[0].as_string().map(|s| s.to_uppercase());
                Ok(Rcvar::new(upper.map_or(Variable::Null, Variable::String)))
            }),
        )),
    );
    runtime
}

#[test]
fn test_custom_function_composes_with_builtins() {
    let runtime = runtime();
    let expr = runtime.compile("people[*].name | map(&upper(@), @)").unwrap();
    let data = Variable::from_json(r#"{"people": [{"name": "ada"}, {"name": "bob"}]}"#).unwrap();

    assert_eq!(expr.search(data).unwrap().to_string(), r#"["ADA","BOB"]"#);
}

#[test]
fn test_trait_function_receives_expref() {
    let runtime = runtime();
    let expr = runtime.compile("map_values(&length(@), @)").unwrap();
    let data = Variable::from_json(r#"{"a": [1, 2], "b": "xyz"}"#).unwrap();

    assert_eq!(expr.search(data).unwrap().to_string(), r#"{"a":2,"b":3}"#);
}

#[test]
fn test_custom_function_signature_is_enforced() {
    let runtime = runtime();
    let err = runtime.compile("upper(`1`)").unwrap().search(Variable::Null).unwrap_err();

    assert_eq!(
        err.reason,
        ErrorReason::Runtime(RuntimeError::InvalidType {
            expected: "string".to_string(),
            actual: "number".to_string(),
            position: 0,
        })
    );
}

#[test]
fn test_runtimes_are_independent() {
    let custom = runtime();
    let default = jmespath::compile("upper('a')").unwrap();

    let err = default.search(Variable::Null).unwrap_err();
    assert_eq!(
        err.reason,
        ErrorReason::Runtime(RuntimeError::UnknownFunction("upper".to_string()))
    );
    let result = custom.compile("upper('a')").unwrap().search(Variable::Null).unwrap();
    assert_eq!(result.as_string().map(String::as_str), Some("A"));
}

#[test]
fn test_deregistered_builtin_is_unknown() {
    let mut runtime = Runtime::with_builtins();
    runtime.deregister_function("length");

    let err = runtime.compile("length(@)").unwrap().search(Variable::Null).unwrap_err();
    assert_eq!(err.to_string().lines().next(), Some(
        "Runtime error: Call to undefined function length (line 1, column 1)"
    ));
}

#[test]
fn test_builtins_through_default_runtime() {
    let data = Variable::from_json(
        r#"{"items": [{"n": "b", "p": 3.5}, {"n": "a", "p": 1}, {"n": "c", "p": 2}]}"#,
    )
    .unwrap();
    let cases = [
        ("sum(items[*].p)", "6.5"),
        ("avg(items[*].p)", "2.1666666666666665"),
        ("max_by(items, &p).n", r#""b""#),
        ("min_by(items, &n).n", r#""a""#),
        ("sort_by(items, &p)[*].n", r#"["a","c","b"]"#),
        ("join('-', sort(items[*].n))", r#""a-b-c""#),
        ("length(keys(items[0]))", "2"),
        ("to_string(items[1].p)", r#""1""#),
        ("type(items[0].p)", r#""number""#),
        ("reverse(items[*].n)", r#"["c","a","b"]"#),
        ("not_null(items[5], items[0].n)", r#""b""#),
        ("starts_with(items[0].n, 'b')", "true"),
        ("floor(items[0].p)", "3"),
        ("ceil(items[0].p)", "4"),
        ("abs(`-2`)", "2"),
        ("to_number('42')", "42"),
        ("to_array(items[0].n)", r#"["b"]"#),
        ("values(items[0])", r#"["b",3.5]"#),
        ("merge(items[0], `{\"n\": \"z\"}`).n", r#""z""#),
        ("contains(items[*].n, 'c')", "true"),
        ("ends_with(items[2].n, 'c')", "true"),
        ("min(items[*].p)", "1"),
        ("map(&n, items)", r#"["b","a","c"]"#),
    ];

    for (expression, expected) in cases {
        let result = jmespath::search(expression, data.clone()).unwrap();
        assert_eq!(result.to_string(), expected, "{expression}");
    }
}
