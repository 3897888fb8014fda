//! Decomposition and recombination along one structural axis.
//!
//! Broadcasting peels exactly one level off a value, maps the units and
//! glues the results back together. Positional axes keep unit order;
//! keyed axes keep the unit keys.

use std::fmt;
use std::sync::Arc;

use super::{Dict, Scalar, Value};
use crate::Rank;

/// The axis a value is split along.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Axis {
    /// Table → Dict rows.
    Rows,
    /// Table → one List per key.
    Columns,
    /// Dict → keyed Scalars.
    Fields,
    /// List → Scalars.
    Items,
    /// Box → member Lists.
    Members,
}

impl Axis {
    /// Keyed axes recombine by key; positional axes by position.
    #[inline]
    pub fn is_keyed(self) -> bool {
        matches!(self, Axis::Columns | Axis::Fields)
    }

    /// Glue mapped units back together.
    ///
    /// `keys` must be the keys from the matching [`Decomposition`] (empty
    /// for positional axes). `unit_hint` is the rank each result was
    /// expected to have; it is only consulted when `results` is empty.
    pub fn recombine(
        self,
        keys: &[String],
        results: Vec<Value>,
        unit_hint: Option<Rank>,
    ) -> Result<Value, ShapeError> {
        debug_assert!(!self.is_keyed() || keys.len() == results.len());

        let Some(first) = results.first() else {
            return self.recombine_empty(unit_hint);
        };
        let first_kind = first.kind_name();
        let first_rank = first.rank();
        if let Some(other) = results.iter().find(|r| r.rank() != first_rank) {
            return Err(ShapeError::Mixed {
                first: first_kind,
                other: other.kind_name(),
            });
        }

        match (first_rank, self.is_keyed()) {
            (Some(Rank::Scalar), false) => Ok(Value::list(into_scalars(results))),
            (Some(Rank::Scalar), true) => Ok(Value::dict(
                keys.iter().cloned().zip(into_scalars(results)).collect(),
            )),
            (Some(Rank::Row), false) => Ok(Value::Table(Arc::new(
                results
                    .into_iter()
                    .filter_map(|r| match r {
                        Value::Dict(d) => Some(d),
                        _ => None,
                    })
                    .collect(),
            ))),
            (Some(Rank::Column), false) => Ok(Value::Box(Arc::new(
                results
                    .into_iter()
                    .filter_map(|r| match r {
                        Value::List(items) => Some(items),
                        _ => None,
                    })
                    .collect(),
            ))),
            (Some(Rank::Column), true) => columns_to_table(keys, results),
            _ => Err(ShapeError::Unrecombinable {
                kind: first_kind,
                axis: self,
            }),
        }
    }

    fn recombine_empty(self, unit_hint: Option<Rank>) -> Result<Value, ShapeError> {
        match (unit_hint, self.is_keyed()) {
            (Some(Rank::Scalar), false) => Ok(Value::list(Vec::new())),
            (Some(Rank::Scalar), true) => Ok(Value::dict(Dict::new())),
            (Some(Rank::Row) | Some(Rank::Column), true) | (Some(Rank::Row), false) => {
                Ok(Value::table(Vec::new()))
            }
            (Some(Rank::Column), false) => Ok(Value::boxed(Vec::new())),
            (Some(Rank::Table) | None, _) => Err(ShapeError::EmptyWithoutShape { axis: self }),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Rows => "rows",
            Axis::Columns => "columns",
            Axis::Fields => "fields",
            Axis::Items => "items",
            Axis::Members => "members",
        };
        f.write_str(name)
    }
}

/// One level of a value, split into units.
#[derive(Clone, Debug, PartialEq)]
pub struct Decomposition {
    pub axis: Axis,
    /// Unit keys, parallel to `units`; empty on positional axes.
    pub keys: Vec<String>,
    pub units: Vec<Value>,
}

/// Failure to split or glue values.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("a {kind} cannot be decomposed")]
    Indivisible { kind: &'static str },

    #[error("column `{key}` is missing from row {row}")]
    MissingColumn { key: String, row: usize },

    #[error("column `{key}` has {found} entries, expected {expected}")]
    Ragged {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("mixed results: {first} and {other}")]
    Mixed {
        first: &'static str,
        other: &'static str,
    },

    #[error("{kind} results cannot be recombined along {axis}")]
    Unrecombinable { kind: &'static str, axis: Axis },

    #[error("empty {axis} decomposition with no result shape")]
    EmptyWithoutShape { axis: Axis },
}

impl Value {
    /// The axis a broadcast of an operator with input rank `rank_in` splits
    /// this value along, or `None` for scalars.
    ///
    /// Tables split into rows for row/scalar operators and into columns for
    /// column operators.
    pub fn axis_for(&self, rank_in: Rank) -> Option<Axis> {
        match self {
            Value::Scalar(_) => None,
            Value::Dict(_) => Some(Axis::Fields),
            Value::List(_) => Some(Axis::Items),
            Value::Box(_) => Some(Axis::Members),
            Value::Table(_) if rank_in == Rank::Column => Some(Axis::Columns),
            Value::Table(_) => Some(Axis::Rows),
        }
    }

    /// Split one level off this value along `axis_for(rank_in)`.
    pub fn decompose(&self, rank_in: Rank) -> Result<Decomposition, ShapeError> {
        let (axis, keys, units) = match self {
            Value::Scalar(_) => {
                return Err(ShapeError::Indivisible {
                    kind: self.kind_name(),
                })
            }
            Value::Table(rows) if rank_in == Rank::Column => {
                let (keys, columns) = table_columns(rows)?;
                (Axis::Columns, keys, columns)
            }
            Value::Table(rows) => (
                Axis::Rows,
                Vec::new(),
                rows.iter().map(|row| Value::Dict(Arc::clone(row))).collect(),
            ),
            Value::Dict(fields) => {
                let (keys, units) = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Scalar(v.clone())))
                    .unzip();
                (Axis::Fields, keys, units)
            }
            Value::List(items) => (
                Axis::Items,
                Vec::new(),
                items.iter().cloned().map(Value::Scalar).collect(),
            ),
            Value::Box(members) => (
                Axis::Members,
                Vec::new(),
                members.iter().map(|m| Value::List(Arc::clone(m))).collect(),
            ),
        };
        debug_assert_eq!(self.axis_for(rank_in), Some(axis));
        Ok(Decomposition { axis, keys, units })
    }
}

/// Column view of a table: sorted union of keys, every row must carry all.
fn table_columns(rows: &[Arc<Dict>]) -> Result<(Vec<String>, Vec<Value>), ShapeError> {
    let mut keys: Vec<String> = rows.iter().flat_map(|row| row.keys().cloned()).collect();
    keys.sort_unstable();
    keys.dedup();

    let mut columns = Vec::with_capacity(keys.len());
    for key in &keys {
        let mut column = Vec::with_capacity(rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            let Some(cell) = row.get(key) else {
                return Err(ShapeError::MissingColumn {
                    key: key.clone(),
                    row: row_index + 1,
                });
            };
            column.push(cell.clone());
        }
        columns.push(Value::list(column));
    }
    Ok((keys, columns))
}

fn columns_to_table(keys: &[String], results: Vec<Value>) -> Result<Value, ShapeError> {
    let columns: Vec<Arc<Vec<Scalar>>> = results
        .into_iter()
        .filter_map(|r| match r {
            Value::List(items) => Some(items),
            _ => None,
        })
        .collect();
    let height = columns.first().map_or(0, |c| c.len());
    if let Some((key, column)) = keys.iter().zip(&columns).find(|(_, c)| c.len() != height) {
        return Err(ShapeError::Ragged {
            key: key.clone(),
            expected: height,
            found: column.len(),
        });
    }

    let rows = (0..height)
        .map(|i| {
            keys.iter()
                .zip(&columns)
                .map(|(key, column)| (key.clone(), column[i].clone()))
                .collect::<Dict>()
        })
        .collect();
    Ok(Value::table(rows))
}

fn into_scalars(results: Vec<Value>) -> Vec<Scalar> {
    results
        .into_iter()
        .filter_map(|r| match r {
            Value::Scalar(s) => Some(s),
            _ => None,
        })
        .collect()
}
