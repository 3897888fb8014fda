//! Runtime values.
//!
//! Five closed kinds: `Scalar`, `List`, `Dict`, `Table` and `Box`. Every
//! container is behind an `Arc` so values are cheap to clone and can be
//! shared between worker threads; construction goes through the factory
//! methods on [`Value`].

mod scalar;
mod shape;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::Rank;

pub use scalar::Scalar;
pub use shape::{Axis, Decomposition, ShapeError};

/// A dict / table row: unique string keys mapped to scalars.
///
/// Key order carries no meaning; a `BTreeMap` keeps iteration (and with it
/// column decomposition) deterministic.
pub type Dict = BTreeMap<String, Scalar>;

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// A string or number (rank 0).
    Scalar(Scalar),
    /// Ordered scalars (rank 1).
    List(Arc<Vec<Scalar>>),
    /// Keyed scalars (rank 0.5).
    Dict(Arc<Dict>),
    /// Ordered rows (rank 1.5). Rows may carry different key sets.
    Table(Arc<Vec<Arc<Dict>>>),
    /// Independent lists of any length; has no single rank.
    Box(Arc<Vec<Arc<Vec<Scalar>>>>),
}

impl Value {
    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Scalar(Scalar::Int(n))
    }

    #[inline]
    pub fn float(x: f64) -> Self {
        Value::Scalar(Scalar::Float(x))
    }

    #[inline]
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Scalar(Scalar::str(s))
    }

    pub fn list(items: Vec<Scalar>) -> Self {
        Value::List(Arc::new(items))
    }

    pub fn dict(entries: Dict) -> Self {
        Value::Dict(Arc::new(entries))
    }

    pub fn table(rows: Vec<Dict>) -> Self {
        Value::Table(Arc::new(rows.into_iter().map(Arc::new).collect()))
    }

    pub fn boxed(members: Vec<Vec<Scalar>>) -> Self {
        Value::Box(Arc::new(members.into_iter().map(Arc::new).collect()))
    }

    /// Build a dict from `(key, scalar)` pairs. Later duplicates win.
    pub fn dict_from<K, S, I>(entries: I) -> Self
    where
        K: Into<String>,
        S: Into<Scalar>,
        I: IntoIterator<Item = (K, S)>,
    {
        Value::dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Rank of the value; `None` for a `Box`.
    pub fn rank(&self) -> Option<Rank> {
        match self {
            Value::Scalar(_) => Some(Rank::Scalar),
            Value::Dict(_) => Some(Rank::Row),
            Value::List(_) => Some(Rank::Column),
            Value::Table(_) => Some(Rank::Table),
            Value::Box(_) => None,
        }
    }

    /// Name of the value's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(s) => s.kind_name(),
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Table(_) => "table",
            Value::Box(_) => "box",
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Number of rows a row-map over this value would visit.
    pub fn row_count(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::Table(rows) => Some(rows.len()),
            Value::Box(members) => Some(members.len()),
            Value::Scalar(_) | Value::Dict(_) => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::from(s))
    }
}

fn write_dict(f: &mut fmt::Formatter<'_>, dict: &Dict) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (key, value)) in dict.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{key}: ")?;
        write_scalar_literal(f, value)?;
    }
    write!(f, "}}")
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Scalar]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_scalar_literal(f, item)?;
    }
    write!(f, "]")
}

/// Scalars nested in containers are written as literals (strings quoted).
fn write_scalar_literal(f: &mut fmt::Formatter<'_>, scalar: &Scalar) -> fmt::Result {
    match scalar {
        Scalar::Str(s) => write!(f, "{s:?}"),
        other => write!(f, "{other}"),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{s}"),
            Value::List(items) => write_list(f, items),
            Value::Dict(dict) => write_dict(f, dict),
            Value::Table(rows) => {
                write!(f, "[")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_dict(f, row)?;
                }
                write!(f, "]")
            }
            Value::Box(members) => {
                write!(f, "[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_list(f, member)?;
                }
                write!(f, "]")
            }
        }
    }
}
