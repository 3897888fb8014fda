//! Row-map (`|`) and whole-table (`||`) application.

use brier_ir::{Rank, Value};
use rayon::prelude::*;
use tracing::trace;

use crate::dispatch::{apply_with, unit_rank};
use crate::errors::{
    row_map_input, row_map_rank, whole_table_input, whole_table_rank, EvalResult,
};
use crate::operator::{Operand, Operator};

/// Apply `op` once per row of a table (item of a list, member of a box) and
/// collect the results positionally. The result has one entry per row.
pub fn row_map(op: &Operator, arg: &Value, operand: Option<&Operand>, parallel: bool) -> EvalResult {
    let rank_in = op.rank_in();
    if rank_in > Rank::Row {
        return Err(row_map_rank(&op.name(), rank_in));
    }
    if arg.row_count().is_none() {
        return Err(row_map_input(&op.name(), arg));
    }

    let operand = op.resolve_operand(operand)?;
    let operand = operand.as_ref();
    // rank_in is at most Row here, so a table always splits into rows
    let split = arg.decompose(rank_in)?;
    trace!(op = %op, axis = %split.axis, rows = split.units.len(), parallel, "row-map");

    let results = if parallel {
        let results: Vec<EvalResult> = split
            .units
            .par_iter()
            .map(|row| apply_with(op, row, operand, false))
            .collect();
        results.into_iter().collect::<Result<Vec<_>, _>>()?
    } else {
        split
            .units
            .iter()
            .map(|row| apply_with(op, row, operand, false))
            .collect::<Result<Vec<_>, _>>()?
    };
    let hint = Rank::broadcast(rank_in, op.rank_out(), unit_rank(split.axis));
    Ok(split.axis.recombine(&[], results, hint)?)
}

/// Apply a table-ranked operator once to a whole table.
pub fn whole_table(op: &Operator, arg: &Value, operand: Option<&Operand>) -> EvalResult {
    let rank_in = op.rank_in();
    if rank_in != Rank::Table {
        return Err(whole_table_rank(&op.name(), rank_in));
    }
    if !matches!(arg, Value::Table(_)) {
        return Err(whole_table_input(&op.name(), arg));
    }
    apply_with(op, arg, operand, false)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
