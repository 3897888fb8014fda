//! Evaluation errors.
//!
//! `EvalError` is cached per line and cloned to every dependent that asks,
//! so it is `Clone + Eq` and carries no values. Construction for the rank
//! family goes through the factory functions below, which keep the wording
//! of related messages in one place.

use brier_ir::{LineIndex, Rank, ShapeError, Value};

/// Result of applying an operator or evaluating a line.
pub type EvalResult = Result<Value, EvalError>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("unknown operator `{name}`")]
    UnknownOperator { name: String },

    #[error("operator `{name}` is already registered")]
    DuplicateOperatorName { name: String },

    #[error("`{name}` has arity {arity}; operators take 0 or 1 operand")]
    UnsupportedArity { name: String, arity: usize },

    #[error("rank mismatch in `{op}`: {detail}")]
    RankMismatch { op: String, detail: String },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(#[from] ShapeError),

    #[error("cyclic reference through lines {}", join_lines(.cycle))]
    CyclicReference { cycle: Vec<LineIndex> },

    #[error("reference to undefined line ${line}")]
    UndefinedLineReference { line: usize },

    #[error("line {line} failed")]
    DependencyFailed { line: LineIndex },

    #[error("`{op}` has no input")]
    MissingArgument { op: String },

    #[error("`{op}` needs an operand")]
    MissingOperand { op: String },

    #[error("`{op}` takes no operand")]
    UnexpectedOperand { op: String },

    #[error("`{op}` has no operand named `{name}`")]
    UnknownOperandName { op: String, name: String },

    #[error("`{op}` expected {expected}, found {found}")]
    TypeMismatch {
        op: String,
        expected: &'static str,
        found: String,
    },

    #[error("`{op}`: no key `{key}`")]
    MissingKey { op: String, key: String },

    #[error("a chain needs at least one stage")]
    EmptyChain,

    #[error("line {line}: {message}")]
    Parse { line: LineIndex, message: String },

    #[error("worker pool: {message}")]
    WorkerPool { message: String },

    #[error("evaluation of line {line} panicked")]
    Panicked { line: LineIndex },
}

fn join_lines(lines: &[LineIndex]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn rank_name(value: &Value) -> String {
    match value.rank() {
        Some(rank) => format!("a {} (rank {rank})", value.kind_name()),
        None => "a box (no rank)".to_string(),
    }
}

/// Argument rank below the operator's input rank.
#[cold]
pub fn rank_too_low(op: &str, rank_in: Rank, arg: &Value) -> EvalError {
    EvalError::RankMismatch {
        op: op.to_string(),
        detail: format!("expects rank {rank_in}, got {}", rank_name(arg)),
    }
}

/// A named operator returned the wrong rank.
#[cold]
pub fn rank_contract(op: &str, rank_out: Rank, result: &Value) -> EvalError {
    EvalError::RankMismatch {
        op: op.to_string(),
        detail: format!("declared rank {rank_out} output but returned {}", rank_name(result)),
    }
}

/// `|` with an operator above row rank.
#[cold]
pub fn row_map_rank(op: &str, rank_in: Rank) -> EvalError {
    EvalError::RankMismatch {
        op: op.to_string(),
        detail: format!("row-map needs an operator of rank 0 or 0.5, not {rank_in}"),
    }
}

/// `|` over something without rows.
#[cold]
pub fn row_map_input(op: &str, arg: &Value) -> EvalError {
    EvalError::RankMismatch {
        op: op.to_string(),
        detail: format!("row-map needs a table, list or box, got {}", rank_name(arg)),
    }
}

/// `||` with an operator that is not table-ranked.
#[cold]
pub fn whole_table_rank(op: &str, rank_in: Rank) -> EvalError {
    EvalError::RankMismatch {
        op: op.to_string(),
        detail: format!("whole-table apply needs an operator of rank 1.5, not {rank_in}"),
    }
}

/// `||` over something that is not a table.
#[cold]
pub fn whole_table_input(op: &str, arg: &Value) -> EvalError {
    EvalError::RankMismatch {
        op: op.to_string(),
        detail: format!("whole-table apply needs a table, got {}", rank_name(arg)),
    }
}

#[cold]
pub fn type_mismatch(op: &str, expected: &'static str, found: &str) -> EvalError {
    EvalError::TypeMismatch {
        op: op.to_string(),
        expected,
        found: found.to_string(),
    }
}

#[cold]
pub fn missing_operand(op: &str) -> EvalError {
    EvalError::MissingOperand { op: op.to_string() }
}

#[cold]
pub fn unexpected_operand(op: &str) -> EvalError {
    EvalError::UnexpectedOperand { op: op.to_string() }
}

#[cold]
pub fn unknown_operator(name: &str) -> EvalError {
    EvalError::UnknownOperator {
        name: name.to_string(),
    }
}
