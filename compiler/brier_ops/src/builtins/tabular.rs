use std::cmp::Ordering;
use std::sync::Arc;

use brier_ir::{Rank, Scalar, Value};

use super::{dict_arg, operand_text};
use crate::errors::{type_mismatch, EvalError, EvalResult};
use crate::operator::{Arity, Operand, OperatorDef};

pub(super) fn register(defs: &mut Vec<OperatorDef>) {
    defs.push(
        OperatorDef::new("get", Rank::Row, Rank::Scalar, Arity::Unary, get)
            .with_operand("key", None),
    );
    defs.push(OperatorDef::new("keys", Rank::Row, Rank::Column, Arity::Nullary, |arg, _| {
        let dict = dict_arg("keys", arg)?;
        Ok(Value::list(dict.keys().map(Scalar::str).collect()))
    }));
    defs.push(OperatorDef::new("values", Rank::Row, Rank::Column, Arity::Nullary, |arg, _| {
        let dict = dict_arg("values", arg)?;
        Ok(Value::list(dict.values().cloned().collect()))
    }));
    defs.push(OperatorDef::new("count", Rank::Table, Rank::Scalar, Arity::Nullary, count));
    defs.push(
        OperatorDef::new("sortby", Rank::Table, Rank::Table, Arity::Unary, sortby)
            .with_operand("key", None),
    );
}

fn get(arg: &Value, operand: Option<&Operand>) -> EvalResult {
    let dict = dict_arg("get", arg)?;
    let key = operand_text("get", operand)?;
    match dict.get(&key) {
        Some(value) => Ok(Value::Scalar(value.clone())),
        None => Err(EvalError::MissingKey {
            op: "get".to_string(),
            key,
        }),
    }
}

fn count(arg: &Value, _: Option<&Operand>) -> EvalResult {
    match arg {
        Value::Table(rows) => Ok(Value::int(i64::try_from(rows.len()).unwrap_or(i64::MAX))),
        other => Err(type_mismatch("count", "a table", other.kind_name())),
    }
}

/// Stable sort by one column; rows without the key go last.
fn sortby(arg: &Value, operand: Option<&Operand>) -> EvalResult {
    let Value::Table(rows) = arg else {
        return Err(type_mismatch("sortby", "a table", arg.kind_name()));
    };
    let key = operand_text("sortby", operand)?;
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| match (a.get(&key), b.get(&key)) {
        (Some(x), Some(y)) => x.total_cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(Value::Table(Arc::new(sorted)))
}
