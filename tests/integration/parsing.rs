//! Integration tests for the lexer + parser pipeline
//! Tests component interactions at the parsing boundary

use jmespath::ast::{Ast, Comparator, Span};
use jmespath::{ErrorReason, parse};

#[test]
fn test_parse_subexpression() {
    let ast = parse("foo.bar").unwrap();

    assert_eq!(ast.span, Span::new(0, 7));
    match &ast.node {
        Ast::Subexpr { lhs, rhs } => {
            assert_eq!(lhs.node, Ast::Field { name: "foo".to_string() });
            assert_eq!(rhs.node, Ast::Field { name: "bar".to_string() });
            assert_eq!(rhs.span, Span::new(4, 7));
        }
        other => panic!("Expected subexpression, got {other:?}"),
    }
}

#[test]
fn test_parse_pipe_binds_loosest() {
    let ast = parse("a || b | c").unwrap();

    match &ast.node {
        Ast::Subexpr { lhs, rhs } => {
            assert!(matches!(lhs.node, Ast::Or { .. }));
            assert_eq!(rhs.node, Ast::Field { name: "c".to_string() });
        }
        other => panic!("Expected pipe, got {other:?}"),
    }
}

#[test]
fn test_parse_and_binds_tighter_than_or() {
    let ast = parse("a || b && c").unwrap();

    match &ast.node {
        Ast::Or { rhs, .. } => assert!(matches!(rhs.node, Ast::And { .. })),
        other => panic!("Expected or, got {other:?}"),
    }
}

#[test]
fn test_parse_filter_projection() {
    let ast = parse("people[?age > `20`].name").unwrap();

    let Ast::Projection { lhs, rhs } = &ast.node else {
        panic!("Expected projection, got {:?}", ast.node);
    };
    assert_eq!(lhs.node, Ast::Field { name: "people".to_string() });
    let Ast::Condition { predicate, then } = &rhs.node else {
        panic!("Expected condition, got {:?}", rhs.node);
    };
    assert!(matches!(
        predicate.node,
        Ast::Comparison {
            comparator: Comparator::GreaterThan,
            ..
        }
    ));
    assert_eq!(then.node, Ast::Field { name: "name".to_string() });
}

#[test]
fn test_parse_slice_defaults() {
    let ast = parse("[::-1]").unwrap();

    let Ast::Projection { lhs, .. } = &ast.node else {
        panic!("Expected projection, got {:?}", ast.node);
    };
    assert_eq!(
        lhs.node,
        Ast::Slice {
            start: None,
            stop: None,
            step: -1
        }
    );
}

#[test]
fn test_parse_function_with_expref() {
    let ast = parse("sort_by(people, &age)").unwrap();

    let Ast::Function { name, args } = &ast.node else {
        panic!("Expected function, got {:?}", ast.node);
    };
    assert_eq!(name, "sort_by");
    assert_eq!(args.len(), 2);
    assert!(matches!(args[1].node, Ast::Expref { .. }));
}

#[test]
fn test_parse_multi_hash_keys_keep_order() {
    let ast = parse("{z: a, \"quoted key\": b}").unwrap();

    let Ast::MultiHash { elements } = &ast.node else {
        panic!("Expected multi-select hash, got {:?}", ast.node);
    };
    let keys: Vec<&str> = elements.iter().map(|kv| kv.key.as_str()).collect();
    assert_eq!(keys, ["z", "quoted key"]);
}

#[test]
fn test_parse_whitespace_insensitive() {
    let data = jmespath::Variable::from_json(r#"{"foo": [{"bar": 1}]}"#).unwrap();
    let spaced = jmespath::search("foo [ 0 ] . bar", data.clone()).unwrap();
    let compact = jmespath::search("foo[0].bar", data).unwrap();
    assert_eq!(spaced, compact);
    assert_eq!(compact.as_number(), Some(1.0));
}

#[test]
fn test_parse_errors_carry_position() {
    let cases = [
        ("foo.", 4),
        ("foo[", 4),
        ("foo[0", 5),
        ("[a, b", 5),
        ("{a: b", 5),
        ("foo bar", 4),
        ("foo = bar", 4),
        ("`{invalid`", 0),
    ];

    for (expression, offset) in cases {
        let err = parse(expression).unwrap_err();
        assert!(matches!(err.reason, ErrorReason::Parse(_)), "{expression}");
        assert_eq!(err.offset, offset, "{expression}");
        assert_eq!(err.expression, expression);
    }
}

#[test]
fn test_parse_error_display_has_pointer() {
    let err = parse("foo.]").unwrap_err();
    let rendered = err.to_string();

    assert!(rendered.starts_with("Parse error:"));
    assert!(rendered.ends_with("foo.]\n    ^"));
}

#[test]
fn test_parse_error_on_second_line() {
    let err = parse("foo\n| ]").unwrap_err();

    assert_eq!(err.line, 2);
    assert_eq!(err.column, 3);
}

#[test]
fn test_deeply_nested_expression_is_rejected() {
    let expression = format!("{}foo{}", "(".repeat(10_000), ")".repeat(10_000));
    let err = jmespath::compile(&expression).unwrap_err();

    assert!(matches!(err.reason, ErrorReason::Parse(_)));
    assert!(err.to_string().contains("nested too deeply"));
}

#[test]
fn test_error_column_counts_characters() {
    let err = parse("'é' ~").unwrap_err();

    assert_eq!(err.offset, 5);
    assert_eq!(err.column, 5);
}
