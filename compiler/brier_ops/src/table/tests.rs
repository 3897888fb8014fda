use brier_ir::{Dict, Scalar};
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::EvalError;
use crate::registry::global_registry;

fn op(name: &str) -> Operator {
    Operator::Named(global_registry().lookup(name).unwrap())
}

fn people() -> Value {
    let row = |name: &str, age: i64| {
        Dict::from([
            ("name".to_string(), Scalar::str(name)),
            ("age".to_string(), Scalar::Int(age)),
        ])
    };
    Value::table(vec![row("cy", 40), row("al", 30), row("bo", 35)])
}

#[test]
fn test_row_map_one_result_per_row() {
    let key = Operand::Value(Value::str("name"));
    let result = row_map(&op("get"), &people(), Some(&key), false).unwrap();
    assert_eq!(
        result,
        Value::list(vec![Scalar::str("cy"), Scalar::str("al"), Scalar::str("bo")])
    );
}

#[test]
fn test_row_map_row_to_list_gives_box() {
    let result = row_map(&op("keys"), &people(), None, false).unwrap();
    let keys = vec![Scalar::str("age"), Scalar::str("name")];
    assert_eq!(result, Value::boxed(vec![keys.clone(), keys.clone(), keys]));
}

#[test]
fn test_row_map_scalar_op_over_list_and_box() {
    let list = Value::list(vec![Scalar::str("a"), Scalar::str("b")]);
    assert_eq!(
        row_map(&op("upper"), &list, None, true),
        Ok(Value::list(vec![Scalar::str("A"), Scalar::str("B")]))
    );

    let boxed = Value::boxed(vec![vec![Scalar::str("a")], vec![]]);
    assert_eq!(
        row_map(&op("upper"), &boxed, None, false),
        Ok(Value::boxed(vec![vec![Scalar::str("A")], vec![]]))
    );
}

#[test]
fn test_row_map_rejects_high_rank_operators() {
    let err = row_map(&op("join"), &people(), None, false).unwrap_err();
    assert!(matches!(err, EvalError::RankMismatch { ref detail, .. } if detail.contains("row-map")));
}

#[test]
fn test_row_map_rejects_non_containers() {
    let err = row_map(&op("upper"), &Value::str("a"), None, false).unwrap_err();
    assert!(matches!(err, EvalError::RankMismatch { .. }));
}

#[test]
fn test_whole_table() {
    assert_eq!(whole_table(&op("count"), &people(), None), Ok(Value::int(3)));

    let key = Operand::Value(Value::str("age"));
    let sorted = whole_table(&op("sortby"), &people(), Some(&key)).unwrap();
    let names = row_map(&op("get"), &sorted, Some(&Operand::Value(Value::str("name"))), false);
    assert_eq!(
        names,
        Ok(Value::list(vec![Scalar::str("al"), Scalar::str("bo"), Scalar::str("cy")]))
    );
}

#[test]
fn test_whole_table_requires_table_rank() {
    assert!(matches!(
        whole_table(&op("upper"), &people(), None),
        Err(EvalError::RankMismatch { .. })
    ));
    assert!(matches!(
        whole_table(&op("count"), &Value::list(vec![]), None),
        Err(EvalError::RankMismatch { .. })
    ));
}
