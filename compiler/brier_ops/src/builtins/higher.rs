use brier_ir::{Axis, Rank, Value};

use super::list_arg;
use crate::dispatch::apply;
use crate::errors::{missing_operand, type_mismatch, EvalResult};
use crate::operator::{Arity, Operand, OperatorDef};

pub(super) fn register(defs: &mut Vec<OperatorDef>) {
    defs.push(
        OperatorDef::new("map", Rank::Column, Rank::Column, Arity::Unary, map)
            .with_operand("op", None),
    );
}

/// Apply an operator operand to every item of a list.
fn map(arg: &Value, operand: Option<&Operand>) -> EvalResult {
    let items = list_arg("map", arg)?;
    let op = match operand {
        Some(Operand::Operator(op)) => op,
        Some(other) => return Err(type_mismatch("map", "an operator", other.kind_name())),
        None => return Err(missing_operand("map")),
    };
    let results = items
        .iter()
        .map(|item| apply(op, &Value::Scalar(item.clone()), None))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Axis::Items.recombine(&[], results, Some(Rank::Scalar))?)
}
