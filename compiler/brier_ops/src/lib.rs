//! Operators for the Brier interpreter.
//!
//! - [`OperatorRegistry`]: name → descriptor table, with [`global_registry`]
//! - [`apply`]: the rank dispatcher
//! - [`Chain`]: derived operators built from stages
//! - [`row_map`] / [`whole_table`]: `|` and `||` application

mod builtins;
mod chain;
mod dispatch;
pub mod errors;
mod operator;
mod registry;
mod table;

pub use chain::{BoundStage, Chain};
pub use dispatch::{apply, apply_with};
pub use errors::{EvalError, EvalResult};
pub use operator::{Arity, Operand, Operator, OperatorDef, OperatorFn};
pub use registry::{global_registry, OperatorRegistry};
pub use table::{row_map, whole_table};
