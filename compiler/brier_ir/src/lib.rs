//! Core data types for the Brier interpreter.
//!
//! - [`Rank`]: the half-step rank ladder
//! - [`Value`]: the five value kinds, with decomposition and recombination
//! - [`LineAst`] / [`Expr`]: parsed lines
//! - [`LineParser`]: the text → AST boundary

mod ast;
mod parse;
mod rank;
pub mod value;
pub mod visitor;

pub use ast::{
    Deps, Expr, LineAst, LineIndex, OpExpr, OperandExpr, Pipeline, Segment, SegmentMode, Stage,
};
pub use parse::{LineParser, ParseError, Span};
pub use rank::{InvalidRank, Rank};
pub use value::{Axis, Decomposition, Dict, Scalar, ShapeError, Value};
