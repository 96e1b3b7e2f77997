//! Values and compiled expressions crossing threads (`sync` feature)

use jmespath::{Expression, Rcvar, Runtime, Variable, compile};
use std::thread;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_shared_types_are_send_and_sync() {
    assert_send_sync::<Rcvar>();
    assert_send_sync::<Variable>();
    assert_send_sync::<Runtime>();
    assert_send_sync::<Expression<'static>>();
}

#[test]
fn test_search_result_moves_to_another_thread() {
    let data = Variable::from_json(
        r#"{"people": [{"name": "ana", "age": 41}, {"name": "bo", "age": 19}]}"#,
    )
    .unwrap();
    let result = compile("people[?age > `30`].name").unwrap().search(data).unwrap();

    let handle = thread::spawn(move || {
        result
            .as_array()
            .and_then(|names| names.first())
            .and_then(|name| name.as_string().cloned())
    });
    assert_eq!(handle.join().unwrap(), Some("ana".to_string()));
}

#[test]
fn test_expression_searched_from_many_threads() {
    let expr = compile("length(@)").unwrap();

    let handles: Vec<_> = (0..4_usize)
        .map(|n| {
            let expr = expr.clone();
            thread::spawn(move || {
                let data = Variable::Array(
                    (0..n).map(|i| Rcvar::new(Variable::Number(i as f64))).collect(),
                );
                expr.search(data).unwrap().as_number()
            })
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(n as f64));
    }
}
