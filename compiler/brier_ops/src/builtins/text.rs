use brier_ir::{Rank, Scalar, Value};

use super::{list_arg, operand_text, scalar_arg};
use crate::errors::{type_mismatch, EvalError, EvalResult};
use crate::operator::{Arity, Operand, OperatorDef};

/// Largest `{:.N}` the formatter accepts.
const MAX_PRECISION: usize = 65_535;

pub(super) fn register(defs: &mut Vec<OperatorDef>) {
    defs.push(
        OperatorDef::new("join", Rank::Column, Rank::Scalar, Arity::Unary, join)
            .with_operand("sep", Some(Value::str(" "))),
    );
    defs.push(
        OperatorDef::new("split", Rank::Scalar, Rank::Column, Arity::Unary, split)
            .with_operand("sep", Some(Value::str(" "))),
    );
    defs.push(
        OperatorDef::new("format", Rank::Scalar, Rank::Scalar, Arity::Unary, format)
            .with_operand("fmt", None),
    );
    defs.push(OperatorDef::new(
        "upper",
        Rank::Scalar,
        Rank::Scalar,
        Arity::Nullary,
        |arg, _| map_str("upper", arg, str::to_uppercase),
    ));
    defs.push(OperatorDef::new(
        "lower",
        Rank::Scalar,
        Rank::Scalar,
        Arity::Nullary,
        |arg, _| map_str("lower", arg, str::to_lowercase),
    ));
}

fn join(arg: &Value, operand: Option<&Operand>) -> EvalResult {
    let items = list_arg("join", arg)?;
    let sep = operand_text("join", operand)?;
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    Ok(Value::str(parts.join(&sep)))
}

fn split(arg: &Value, operand: Option<&Operand>) -> EvalResult {
    let text = scalar_arg("split", arg)?.to_string();
    let sep = operand_text("split", operand)?;
    let parts = if sep.is_empty() {
        text.chars().map(|c| Scalar::str(c.to_string())).collect()
    } else {
        text.split(sep.as_str()).map(Scalar::str).collect()
    };
    Ok(Value::list(parts))
}

fn format(arg: &Value, operand: Option<&Operand>) -> EvalResult {
    let value = scalar_arg("format", arg)?;
    let template = operand_text("format", operand)?;
    render(&template, value).map(Value::str)
}

/// Replace every `{}` with the value and every `{:.N}` / `{:.Nf}` with the
/// value as a number with `N` decimals. Other braces are left alone.
fn render(template: &str, value: &Scalar) -> Result<String, EvalError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else {
            break;
        };
        let spec = &rest[open + 1..open + len];
        out.push_str(&rest[..open]);
        match placeholder(spec, value)? {
            Some(text) => out.push_str(&text),
            None => out.push_str(&rest[open..=open + len]),
        }
        rest = &rest[open + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn placeholder(spec: &str, value: &Scalar) -> Result<Option<String>, EvalError> {
    if spec.is_empty() {
        return Ok(Some(value.to_string()));
    }
    let Some(precision) = spec.strip_prefix(":.") else {
        return Ok(None);
    };
    let digits = precision.strip_suffix('f').unwrap_or(precision);
    let Ok(places) = digits.parse::<usize>() else {
        return Ok(None);
    };
    if places > MAX_PRECISION {
        return Err(type_mismatch("format", "a precision up to 65535", digits));
    }
    let x = value
        .as_f64()
        .ok_or_else(|| type_mismatch("format", "a number", value.kind_name()))?;
    Ok(Some(format!("{x:.places$}")))
}

fn map_str(op: &str, arg: &Value, f: impl Fn(&str) -> String) -> EvalResult {
    let scalar = scalar_arg(op, arg)?;
    match scalar.as_str() {
        Some(s) => Ok(Value::str(f(s))),
        None => Err(type_mismatch(op, "a string", scalar.kind_name())),
    }
}
