//! Built-in operators.
//!
//! Every built-in is a plain function called at exactly its input rank; the
//! dispatcher takes care of broadcasting. Argument extraction helpers below
//! still check the kind so a mis-declared rank surfaces as an error rather
//! than a panic.

mod higher;
mod numeric;
mod tabular;
mod text;

use brier_ir::{Dict, Scalar, Value};

use crate::errors::{missing_operand, type_mismatch, EvalError};
use crate::operator::{Operand, OperatorDef};

/// Descriptors for every built-in operator.
pub(crate) fn all() -> Vec<OperatorDef> {
    let mut defs = Vec::new();
    text::register(&mut defs);
    numeric::register(&mut defs);
    tabular::register(&mut defs);
    higher::register(&mut defs);
    defs
}

fn scalar_arg<'a>(op: &str, arg: &'a Value) -> Result<&'a Scalar, EvalError> {
    match arg {
        Value::Scalar(scalar) => Ok(scalar),
        other => Err(type_mismatch(op, "a scalar", other.kind_name())),
    }
}

fn list_arg<'a>(op: &str, arg: &'a Value) -> Result<&'a [Scalar], EvalError> {
    match arg {
        Value::List(items) => Ok(items),
        other => Err(type_mismatch(op, "a list", other.kind_name())),
    }
}

fn dict_arg<'a>(op: &str, arg: &'a Value) -> Result<&'a Dict, EvalError> {
    match arg {
        Value::Dict(dict) => Ok(dict),
        other => Err(type_mismatch(op, "a dict", other.kind_name())),
    }
}

fn operand_scalar<'a>(op: &str, operand: Option<&'a Operand>) -> Result<&'a Scalar, EvalError> {
    match operand {
        Some(Operand::Value(Value::Scalar(scalar))) => Ok(scalar),
        Some(other) => Err(type_mismatch(op, "a scalar operand", other.kind_name())),
        None => Err(missing_operand(op)),
    }
}

/// The operand as text; numbers are written out.
fn operand_text(op: &str, operand: Option<&Operand>) -> Result<String, EvalError> {
    operand_scalar(op, operand).map(ToString::to_string)
}
