use brier_ir::{Dict, Scalar, ShapeError};
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::EvalError;
use crate::registry::{global_registry, OperatorRegistry};

fn op(name: &str) -> Operator {
    Operator::Named(global_registry().lookup(name).unwrap())
}

fn strs(items: &[&str]) -> Vec<Scalar> {
    items.iter().map(|s| Scalar::str(*s)).collect()
}

fn row(pairs: &[(&str, &str)]) -> Dict {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Scalar::str(*v)))
        .collect()
}

#[test]
fn test_join_list_is_direct() {
    let result = apply(&op("join"), &Value::list(strs(&["a", "b", "c"])), None).unwrap();
    assert_eq!(result, Value::str("a b c"));
}

#[test]
fn test_join_table_splits_by_column() {
    let table = Value::table(vec![
        row(&[("x", "a"), ("y", "1")]),
        row(&[("x", "b"), ("y", "2")]),
        row(&[("x", "c"), ("y", "3")]),
    ]);
    let sep = Operand::Value(Value::str("-"));
    let result = apply(&op("join"), &table, Some(&sep)).unwrap();
    assert_eq!(result, Value::dict_from([("x", "a-b-c"), ("y", "1-2-3")]));
}

#[test]
fn test_scalar_op_on_table_keeps_shape() {
    let table = Value::table(vec![row(&[("x", "a")]), row(&[("x", "b")])]);
    let result = apply(&op("upper"), &table, None).unwrap();
    assert_eq!(
        result,
        Value::table(vec![row(&[("x", "A")]), row(&[("x", "B")])])
    );
}

#[test]
fn test_split_over_list_gives_box() {
    let result = apply(&op("split"), &Value::list(strs(&["a b", "c"])), None).unwrap();
    assert_eq!(
        result,
        Value::boxed(vec![strs(&["a", "b"]), strs(&["c"])])
    );
    assert_eq!(result.rank(), None);
}

#[test]
fn test_split_over_dict_builds_table_by_columns() {
    let dict = Value::dict_from([("a", "x y"), ("b", "p q")]);
    let result = apply(&op("split"), &dict, None).unwrap();
    assert_eq!(
        result,
        Value::table(vec![
            row(&[("a", "x"), ("b", "p")]),
            row(&[("a", "y"), ("b", "q")]),
        ])
    );
}

#[test]
fn test_ragged_keyed_lists_are_a_shape_mismatch() {
    let dict = Value::dict_from([("a", "x y"), ("b", "p")]);
    assert_eq!(
        apply(&op("split"), &dict, None),
        Err(EvalError::ShapeMismatch(ShapeError::Ragged {
            key: "b".to_string(),
            expected: 2,
            found: 1,
        }))
    );
}

#[test]
fn test_box_members_are_lists() {
    let boxed = Value::boxed(vec![strs(&["a", "b"]), strs(&[]), strs(&["c"])]);
    let result = apply(&op("len"), &boxed, None).unwrap();
    assert_eq!(
        result,
        Value::list(vec![Scalar::Int(2), Scalar::Int(0), Scalar::Int(1)])
    );
}

#[test]
fn test_rank_below_rank_in() {
    let err = apply(&op("join"), &Value::str("a"), None).unwrap_err();
    assert!(matches!(err, EvalError::RankMismatch { ref op, .. } if op == "join"));

    let boxed = Value::boxed(vec![]);
    let err = apply(&op("count"), &boxed, None).unwrap_err();
    assert!(matches!(err, EvalError::RankMismatch { .. }));
}

#[test]
fn test_named_operator_must_honour_rank_out() {
    let mut registry = OperatorRegistry::new();
    let liar = registry
        .register("liar", Rank::Scalar, Rank::Scalar, 0, |arg, _| {
            Ok(Value::list(vec![arg.as_scalar().cloned().unwrap_or(Scalar::Int(0))]))
        })
        .unwrap();
    let err = apply(&Operator::Named(liar), &Value::int(1), None).unwrap_err();
    assert!(
        matches!(err, EvalError::RankMismatch { ref detail, .. } if detail.contains("declared rank 0"))
    );
}

#[test]
fn test_operand_rules() {
    let extra = Operand::Value(Value::int(1));
    assert_eq!(
        apply(&op("len"), &Value::list(vec![]), Some(&extra)),
        Err(EvalError::UnexpectedOperand { op: "len".into() })
    );
    assert_eq!(
        apply(&op("+"), &Value::int(1), None),
        Err(EvalError::MissingOperand { op: "+".into() })
    );
}

#[test]
fn test_empty_list_recombines_by_hint() {
    assert_eq!(
        apply(&op("upper"), &Value::list(vec![]), None),
        Ok(Value::list(vec![]))
    );
    assert_eq!(
        apply(&op("join"), &Value::table(vec![]), None),
        Ok(Value::dict(Dict::new()))
    );
}

#[test]
fn test_parallel_matches_sequential() {
    let items: Vec<Scalar> = (0..200).map(|i| Scalar::str(format!("w{i} x"))).collect();
    let list = Value::list(items);
    assert_eq!(
        apply_with(&op("split"), &list, None, true),
        apply(&op("split"), &list, None)
    );

    // the first failing unit is reported, not whichever finished first
    let mixed = Value::list(vec![
        Scalar::Int(1),
        Scalar::str("a"),
        Scalar::Int(2),
        Scalar::str("b"),
    ]);
    let seq = apply(&op("upper"), &mixed, None);
    assert!(seq.is_err());
    assert_eq!(apply_with(&op("upper"), &mixed, None, true), seq);
}
