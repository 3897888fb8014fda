use brier_ir::{Rank, Scalar, Value};

use super::{list_arg, operand_scalar, scalar_arg};
use crate::errors::{type_mismatch, EvalResult};
use crate::operator::{Arity, Operand, OperatorDef};

pub(super) fn register(defs: &mut Vec<OperatorDef>) {
    defs.push(OperatorDef::new("sum", Rank::Column, Rank::Scalar, Arity::Nullary, sum));
    defs.push(OperatorDef::new("len", Rank::Column, Rank::Scalar, Arity::Nullary, len));
    defs.push(OperatorDef::new("int", Rank::Scalar, Rank::Scalar, Arity::Nullary, int));
    defs.push(OperatorDef::new("float", Rank::Scalar, Rank::Scalar, Arity::Nullary, float));
    defs.push(
        OperatorDef::new("+", Rank::Scalar, Rank::Scalar, Arity::Unary, plus)
            .with_operand("rhs", None),
    );
}

/// Integer sum while every item is an integer and nothing overflows,
/// float sum otherwise.
fn sum(arg: &Value, _: Option<&Operand>) -> EvalResult {
    let items = list_arg("sum", arg)?;
    let mut exact = Some(0_i64);
    let mut approx = 0.0_f64;
    for item in items {
        let Some(x) = item.as_f64() else {
            return Err(type_mismatch("sum", "numbers", item.kind_name()));
        };
        approx += x;
        exact = match item {
            Scalar::Int(n) => exact.and_then(|total| total.checked_add(*n)),
            _ => None,
        };
    }
    Ok(exact.map_or(Value::float(approx), Value::int))
}

fn len(arg: &Value, _: Option<&Operand>) -> EvalResult {
    let items = list_arg("len", arg)?;
    Ok(Value::int(i64::try_from(items.len()).unwrap_or(i64::MAX)))
}

/// 2^63: floats strictly inside `±LIMIT` truncate into an `i64`.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

#[expect(
    clippy::cast_possible_truncation,
    reason = "int truncates toward zero; the range is checked first"
)]
fn int(arg: &Value, _: Option<&Operand>) -> EvalResult {
    match scalar_arg("int", arg)? {
        Scalar::Int(n) => Ok(Value::int(*n)),
        Scalar::Float(x) if x.is_finite() && x.abs() < I64_LIMIT => Ok(Value::int(x.trunc() as i64)),
        Scalar::Float(x) => Err(type_mismatch("int", "a number in integer range", &x.to_string())),
        Scalar::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::int)
            .map_err(|_| type_mismatch("int", "an integer", "a non-numeric string")),
    }
}

fn float(arg: &Value, _: Option<&Operand>) -> EvalResult {
    let scalar = scalar_arg("float", arg)?;
    if let Some(x) = scalar.as_f64() {
        return Ok(Value::float(x));
    }
    scalar
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(Value::float)
        .ok_or_else(|| type_mismatch("float", "a number", "a non-numeric string"))
}

/// Numbers add (exactly for integers); strings concatenate.
fn plus(arg: &Value, operand: Option<&Operand>) -> EvalResult {
    let lhs = scalar_arg("+", arg)?;
    let rhs = operand_scalar("+", operand)?;
    match (lhs, rhs) {
        (Scalar::Int(a), Scalar::Int(b)) => Ok(a
            .checked_add(*b)
            .map_or_else(|| Value::float(add_f64(lhs, rhs)), Value::int)),
        (Scalar::Str(a), Scalar::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        _ if lhs.is_number() && rhs.is_number() => Ok(Value::float(add_f64(lhs, rhs))),
        _ => Err(type_mismatch(
            "+",
            "two numbers or two strings",
            &format!("{} and {}", lhs.kind_name(), rhs.kind_name()),
        )),
    }
}

fn add_f64(a: &Scalar, b: &Scalar) -> f64 {
    a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default()
}
