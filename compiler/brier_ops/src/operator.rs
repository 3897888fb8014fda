//! Operator descriptors and operands.

use std::fmt;
use std::sync::Arc;

use brier_ir::{Rank, Value};

use crate::chain::Chain;
use crate::errors::{missing_operand, unexpected_operand, EvalError, EvalResult};

/// The function behind a named operator.
///
/// Called with an argument of exactly the operator's input rank and the
/// resolved operand (always `Some` for arity-1 operators, `None` otherwise).
pub type OperatorFn = Arc<dyn Fn(&Value, Option<&Operand>) -> EvalResult + Send + Sync>;

/// Number of operands an operator takes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Arity {
    Nullary,
    Unary,
}

impl Arity {
    pub fn count(self) -> u8 {
        match self {
            Arity::Nullary => 0,
            Arity::Unary => 1,
        }
    }
}

impl TryFrom<usize> for Arity {
    type Error = usize;

    fn try_from(n: usize) -> Result<Self, usize> {
        match n {
            0 => Ok(Arity::Nullary),
            1 => Ok(Arity::Unary),
            other => Err(other),
        }
    }
}

/// An immutable named operator descriptor.
pub struct OperatorDef {
    name: String,
    rank_in: Rank,
    rank_out: Rank,
    arity: Arity,
    operand_name: Option<&'static str>,
    default_operand: Option<Value>,
    func: OperatorFn,
}

impl OperatorDef {
    pub fn new<F>(name: impl Into<String>, rank_in: Rank, rank_out: Rank, arity: Arity, func: F) -> Self
    where
        F: Fn(&Value, Option<&Operand>) -> EvalResult + Send + Sync + 'static,
    {
        OperatorDef {
            name: name.into(),
            rank_in,
            rank_out,
            arity,
            operand_name: None,
            default_operand: None,
            func: Arc::new(func),
        }
    }

    /// Name the operand (for `key=value` arguments) and optionally give it a
    /// default so the operator can be applied without one.
    #[must_use]
    pub fn with_operand(mut self, name: &'static str, default: Option<Value>) -> Self {
        self.operand_name = Some(name);
        self.default_operand = default;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn rank_in(&self) -> Rank {
        self.rank_in
    }

    #[inline]
    pub fn rank_out(&self) -> Rank {
        self.rank_out
    }

    #[inline]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn operand_name(&self) -> Option<&'static str> {
        self.operand_name
    }

    pub fn default_operand(&self) -> Option<&Value> {
        self.default_operand.as_ref()
    }

    /// Call the function directly, without rank checks.
    pub(crate) fn call(&self, arg: &Value, operand: Option<&Operand>) -> EvalResult {
        (self.func)(arg, operand)
    }
}

impl fmt::Debug for OperatorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorDef")
            .field("name", &self.name)
            .field("rank_in", &self.rank_in)
            .field("rank_out", &self.rank_out)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A named or derived operator.
#[derive(Clone, Debug)]
pub enum Operator {
    Named(Arc<OperatorDef>),
    Derived(Arc<Chain>),
}

impl Operator {
    pub fn rank_in(&self) -> Rank {
        match self {
            Operator::Named(def) => def.rank_in(),
            Operator::Derived(chain) => chain.rank_in(),
        }
    }

    pub fn rank_out(&self) -> Rank {
        match self {
            Operator::Named(def) => def.rank_out(),
            Operator::Derived(chain) => chain.rank_out(),
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Operator::Named(def) => def.arity(),
            Operator::Derived(chain) => chain.arity(),
        }
    }

    /// Name used in error messages.
    pub fn name(&self) -> String {
        match self {
            Operator::Named(def) => def.name().to_string(),
            Operator::Derived(chain) => chain.to_string(),
        }
    }

    /// Name an operand may be given with (`sep="-"`).
    pub fn operand_name(&self) -> Option<&'static str> {
        match self {
            Operator::Named(def) => def.operand_name(),
            Operator::Derived(chain) => chain.operand_name(),
        }
    }

    /// Check the name an operand was passed under.
    pub fn check_operand_name(&self, name: &str) -> Result<(), EvalError> {
        if self.operand_name() == Some(name) {
            return Ok(());
        }
        Err(EvalError::UnknownOperandName {
            op: self.name(),
            name: name.to_string(),
        })
    }

    /// Operand to use when the caller supplies none.
    pub fn default_operand(&self) -> Option<Operand> {
        match self {
            Operator::Named(def) => def.default_operand().cloned().map(Operand::Value),
            Operator::Derived(_) => None,
        }
    }

    /// Pick the operand an application actually runs with.
    ///
    /// Arity 0 rejects an operand; arity 1 falls back to the default.
    pub fn resolve_operand(&self, operand: Option<&Operand>) -> Result<Option<Operand>, EvalError> {
        match (self.arity(), operand) {
            (Arity::Nullary, None) => Ok(None),
            (Arity::Nullary, Some(_)) => Err(unexpected_operand(&self.name())),
            (Arity::Unary, Some(operand)) => Ok(Some(operand.clone())),
            (Arity::Unary, None) => self
                .default_operand()
                .map(Some)
                .ok_or_else(|| missing_operand(&self.name())),
        }
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Operator::Named(a), Operator::Named(b)) => Arc::ptr_eq(a, b),
            (Operator::Derived(a), Operator::Derived(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Named(def) => f.write_str(def.name()),
            Operator::Derived(chain) => write!(f, "{chain}"),
        }
    }
}

/// What fills an operator's operand slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Value(Value),
    Operator(Operator),
}

impl Operand {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operand::Value(value) => value.kind_name(),
            Operand::Operator(_) => "operator",
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<Operator> for Operand {
    fn from(op: Operator) -> Self {
        Operand::Operator(op)
    }
}
