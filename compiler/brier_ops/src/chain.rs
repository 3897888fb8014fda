//! Chain compiler.
//!
//! Builds an unnamed operator out of stages, each an operator with an
//! optional pre-bound operand. The derived operator takes its input rank
//! from the first stage and its output rank from the last; it has one
//! operand only if exactly one stage slot is left unbound. Compiling never
//! evaluates anything.

use std::fmt;
use std::sync::Arc;

use brier_ir::{Rank, Value};

use crate::dispatch::apply_with;
use crate::errors::{unexpected_operand, EvalError, EvalResult};
use crate::operator::{Arity, Operand, Operator};

/// One stage of a chain.
#[derive(Clone, Debug)]
pub struct BoundStage {
    pub op: Operator,
    pub operand: Option<Operand>,
    /// Map this stage's broadcast units on the worker pool.
    pub parallel: bool,
}

impl BoundStage {
    pub fn new(op: Operator, operand: Option<Operand>) -> Self {
        BoundStage {
            op,
            operand,
            parallel: false,
        }
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Whether this stage still needs an operand at invocation time.
    fn is_open(&self) -> bool {
        self.operand.is_none()
            && self.op.arity() == Arity::Unary
            && self.op.default_operand().is_none()
    }
}

/// A derived operator.
#[derive(Debug)]
pub struct Chain {
    stages: Vec<BoundStage>,
    rank_in: Rank,
    rank_out: Rank,
    /// Stage that receives the invocation operand.
    open_slot: Option<usize>,
}

impl Chain {
    pub fn compile(stages: Vec<BoundStage>) -> Result<Chain, EvalError> {
        let (Some(first), Some(last)) = (stages.first(), stages.last()) else {
            return Err(EvalError::EmptyChain);
        };
        let rank_in = first.op.rank_in();
        let rank_out = last.op.rank_out();

        if let Some(stage) = stages
            .iter()
            .find(|stage| stage.op.arity() == Arity::Nullary && stage.operand.is_some())
        {
            return Err(unexpected_operand(&stage.op.name()));
        }

        let open: Vec<usize> = stages
            .iter()
            .enumerate()
            .filter(|(_, stage)| stage.is_open())
            .map(|(i, _)| i)
            .collect();
        if open.len() > 1 {
            return Err(EvalError::UnsupportedArity {
                name: display_stages(&stages),
                arity: open.len(),
            });
        }

        Ok(Chain {
            open_slot: open.first().copied(),
            stages,
            rank_in,
            rank_out,
        })
    }

    /// Compile straight into an [`Operator`].
    pub fn compile_operator(stages: Vec<BoundStage>) -> Result<Operator, EvalError> {
        Chain::compile(stages).map(|chain| Operator::Derived(Arc::new(chain)))
    }

    #[inline]
    pub fn rank_in(&self) -> Rank {
        self.rank_in
    }

    #[inline]
    pub fn rank_out(&self) -> Rank {
        self.rank_out
    }

    pub fn arity(&self) -> Arity {
        if self.open_slot.is_some() {
            Arity::Unary
        } else {
            Arity::Nullary
        }
    }

    /// Name of the open slot's operand, if the slot has one.
    pub fn operand_name(&self) -> Option<&'static str> {
        self.open_slot
            .and_then(|slot| self.stages.get(slot))
            .and_then(|stage| stage.op.operand_name())
    }

    /// Feed `arg` through every stage. `operand` fills the open slot.
    pub(crate) fn invoke(&self, arg: &Value, operand: Option<&Operand>) -> EvalResult {
        let mut value = arg.clone();
        for (i, stage) in self.stages.iter().enumerate() {
            let stage_operand = if self.open_slot == Some(i) {
                operand
            } else {
                stage.operand.as_ref()
            };
            value = apply_with(&stage.op, &value, stage_operand, stage.parallel)?;
        }
        Ok(value)
    }
}

fn display_stages(stages: &[BoundStage]) -> String {
    let parts: Vec<String> = stages
        .iter()
        .map(|stage| match &stage.operand {
            Some(Operand::Value(value)) => format!("{} {value}", stage.op),
            Some(Operand::Operator(op)) => format!("{} {op}", stage.op),
            None => stage.op.to_string(),
        })
        .collect();
    format!("({})", parts.join(" |> "))
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_stages(&self.stages))
    }
}
