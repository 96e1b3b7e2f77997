//! Integration tests for compile + search
//! Exercises evaluation through the public API with realistic documents

use jmespath::{ErrorReason, Rcvar, RuntimeError, Variable, compile, search};
use serde_json::json;
use std::collections::BTreeMap;

fn data() -> Variable {
    Variable::from(json!({
        "reservations": [
            {
                "instances": [
                    {"id": "i-1", "state": {"name": "running"}, "tags": ["web", "prod"]},
                    {"id": "i-2", "state": {"name": "stopped"}, "tags": []}
                ]
            },
            {
                "instances": [
                    {"id": "i-3", "state": {"name": "running"}, "tags": ["db"]}
                ]
            }
        ],
        "owner": {"name": "ops", "email": null}
    }))
}

fn eval(expression: &str) -> String {
    search(expression, data()).unwrap().to_string()
}

#[test]
fn test_nested_projections_keep_structure() {
    assert_eq!(
        eval("reservations[*].instances[*].id"),
        r#"[["i-1","i-2"],["i-3"]]"#
    );
}

#[test]
fn test_flatten_merges_levels() {
    assert_eq!(
        eval("reservations[].instances[].id"),
        r#"["i-1","i-2","i-3"]"#
    );
}

#[test]
fn test_filter_then_pipe() {
    assert_eq!(
        eval("reservations[].instances[?state.name == 'running'].id | [0]"),
        r#"["i-1"]"#
    );
}

#[test]
fn test_projection_drops_nulls() {
    assert_eq!(eval("reservations[].instances[].tags[0]"), r#"["web","db"]"#);
}

#[test]
fn test_multi_select_hash_over_projection() {
    assert_eq!(
        eval("reservations[].instances[].{id: id, state: state.name}"),
        r#"[{"id":"i-1","state":"running"},{"id":"i-2","state":"stopped"},{"id":"i-3","state":"running"}]"#
    );
}

#[test]
fn test_or_falls_back_on_null() {
    assert_eq!(eval("owner.email || owner.name"), r#""ops""#);
    assert_eq!(eval("owner.missing"), "null");
}

#[test]
fn test_object_values_projection() {
    // Null values are dropped from projections
    assert_eq!(eval("owner.*"), r#"["ops"]"#);
}

#[test]
fn test_compiled_expression_is_reusable() {
    let expr = compile("length(reservations)").unwrap();

    assert_eq!(expr.search(data()).unwrap().as_number(), Some(2.0));
    assert_eq!(
        expr.search(Variable::from(json!({"reservations": []})))
            .unwrap()
            .as_number(),
        Some(0.0)
    );
}

#[test]
fn test_search_serde_json_value() {
    let result = search("a.b", json!({"a": {"b": [true]}})).unwrap();

    assert_eq!(result.to_string(), "[true]");
}

#[test]
fn test_search_serializable_struct() {
    let mut scores = BTreeMap::new();
    scores.insert("alice", 3);
    scores.insert("bob", 5);

    let result = search("max(values(@))", &scores).unwrap();
    assert_eq!(result.as_number(), Some(5.0));
}

#[test]
fn test_search_shared_variable() {
    let shared = Rcvar::new(Variable::from_json("[1, 2, 3]").unwrap());

    let first = search("[0]", shared.clone()).unwrap();
    assert_eq!(first.as_number(), Some(1.0));
    assert_eq!(shared.as_array().map(Vec::len), Some(3));
}

#[test]
fn test_results_serialize_back_to_json() {
    let result = search("{count: length(@), first: [0]}", json!([1.5, 2])).unwrap();

    let value = serde_json::to_value(&*result).unwrap();
    assert_eq!(value, json!({"count": 2, "first": 1.5}));
}

#[test]
fn test_zero_step_slice_is_runtime_error() {
    let err = search("reservations[::0]", data()).unwrap_err();

    assert_eq!(err.reason, ErrorReason::Runtime(RuntimeError::InvalidSlice));
    assert_eq!(err.offset, 12);
}

#[test]
fn test_runtime_error_points_at_function() {
    let err = search("owner | abs(name)", data()).unwrap_err();

    assert_eq!(err.offset, 8);
    assert_eq!(err.column, 9);
    assert!(err.to_string().contains("Argument 0 expects type number, given string"));
}
