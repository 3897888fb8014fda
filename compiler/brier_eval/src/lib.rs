//! Deferred, dependency-driven evaluation of Brier scripts.
//!
//! A [`Script`] is built from raw lines and a [`brier_ir::LineParser`].
//! Every line is parsed up front; values are computed on demand, memoized
//! per line, and recomputed only after an edit invalidates them.
//!
//! # Architecture
//!
//! ```text
//! evaluate(n) ──► scheduler ──► levels of the dependency closure
//!                    │              │
//!                    │     `&` lines on the pool, the rest in place
//!                    ▼              ▼
//!               resolver: force(n) ──► resolve $deps ──► evaluator
//!                    │                                    │
//!             per-line mutex + condvar           brier_ops dispatcher
//! ```
//!
//! Lines on a dependency cycle fail with `CyclicReference` naming the whole
//! cycle; lines reading a failed line fail with `DependencyFailed`.

mod config;
mod eval;
mod graph;
mod line;
mod resolve;
mod scheduler;
mod script;
mod stack;

pub use config::ScriptConfig;
pub use line::LineStatus;
pub use script::{Script, ScriptBuilder};
