//! Rank dispatcher.
//!
//! `apply` invokes an operator directly when the argument sits at the
//! operator's input rank and otherwise peels one level off the argument,
//! applies itself to every unit and recombines. Tables split into rows for
//! scalar/row operators and into columns for column operators.

use brier_ir::{Axis, Rank, Value};
use rayon::prelude::*;
use tracing::trace;

use crate::errors::{rank_contract, rank_too_low, EvalResult};
use crate::operator::{Operand, Operator};

/// Apply `op` to `arg`, broadcasting as needed. Units are mapped in order on
/// the calling thread.
pub fn apply(op: &Operator, arg: &Value, operand: Option<&Operand>) -> EvalResult {
    apply_with(op, arg, operand, false)
}

/// Apply with an explicit parallelism flag. With `parallel`, units are
/// mapped on the current rayon pool; results (and the reported error, if
/// any) are identical to the sequential form.
pub fn apply_with(op: &Operator, arg: &Value, operand: Option<&Operand>, parallel: bool) -> EvalResult {
    let operand = op.resolve_operand(operand)?;
    broadcast(op, arg, operand.as_ref(), parallel)
}

fn broadcast(op: &Operator, arg: &Value, operand: Option<&Operand>, parallel: bool) -> EvalResult {
    let rank_in = op.rank_in();
    match arg.rank() {
        Some(rank) if rank == rank_in => invoke(op, arg, operand),
        Some(rank) if rank < rank_in => Err(rank_too_low(&op.name(), rank_in, arg)),
        // boxes hold lists; nothing above a column fits in one
        None if rank_in == Rank::Table => Err(rank_too_low(&op.name(), rank_in, arg)),
        _ => {
            let split = arg.decompose(rank_in)?;
            trace!(
                op = %op,
                axis = %split.axis,
                units = split.units.len(),
                parallel,
                "broadcast"
            );
            let results = if parallel {
                let results: Vec<EvalResult> = split
                    .units
                    .par_iter()
                    .map(|unit| broadcast(op, unit, operand, parallel))
                    .collect();
                results.into_iter().collect::<Result<Vec<_>, _>>()?
            } else {
                split
                    .units
                    .iter()
                    .map(|unit| broadcast(op, unit, operand, parallel))
                    .collect::<Result<Vec<_>, _>>()?
            };
            let hint = Rank::broadcast(rank_in, op.rank_out(), unit_rank(split.axis));
            Ok(split.axis.recombine(&split.keys, results, hint)?)
        }
    }
}

/// Base case: the argument is at the operator's input rank.
fn invoke(op: &Operator, arg: &Value, operand: Option<&Operand>) -> EvalResult {
    match op {
        Operator::Named(def) => {
            let result = def.call(arg, operand)?;
            if result.rank() == Some(def.rank_out()) {
                Ok(result)
            } else {
                Err(rank_contract(def.name(), def.rank_out(), &result))
            }
        }
        Operator::Derived(chain) => chain.invoke(arg, operand),
    }
}

/// Rank of the units an axis produces.
pub(crate) fn unit_rank(axis: Axis) -> Rank {
    match axis {
        Axis::Rows => Rank::Row,
        Axis::Columns | Axis::Members => Rank::Column,
        Axis::Fields | Axis::Items => Rank::Scalar,
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
