//! Scalar values: strings and numbers.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A single string or number.
///
/// Integers and floats are both the "number" kind; they are kept apart so
/// that integer arithmetic stays exact.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(Arc<str>),
}

impl Scalar {
    /// Create a string scalar.
    pub fn str(s: impl AsRef<str>) -> Self {
        Scalar::Str(Arc::from(s.as_ref()))
    }

    /// Name of the scalar's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Int(_) | Scalar::Float(_) => "number",
            Scalar::Str(_) => "string",
        }
    }

    /// Whether this scalar is a number.
    pub fn is_number(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }

    /// The numeric value as a float, if this is a number.
    #[expect(
        clippy::cast_precision_loss,
        reason = "scalar floats are f64; large integers lose precision like any mixed arithmetic"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(n) => Some(*n as f64),
            Scalar::Float(x) => Some(*x),
            Scalar::Str(_) => None,
        }
    }

    /// The string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Total order used for sorting: numbers before strings, numbers by
    /// value, strings lexicographically.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Str(a), Scalar::Str(b)) => a.cmp(b),
            (Scalar::Str(_), _) => Ordering::Greater,
            (_, Scalar::Str(_)) => Ordering::Less,
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            (a, b) => {
                let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) else {
                    return Ordering::Equal;
                };
                a.total_cmp(&b)
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{n}"),
            // `{:?}` keeps the fractional part of whole floats (`2.0`, not `2`)
            Scalar::Float(x) => write!(f, "{x:?}"),
            Scalar::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::str(s)
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(Arc::from(s))
    }
}
