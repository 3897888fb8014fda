//! Per-line state.
//!
//! Each line carries its own mutex and completion signal. The value cache
//! lives inside the `Evaluated` phase, so a line can only have a cached
//! value while it is evaluated.

use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

use brier_ir::{LineAst, LineIndex, Value};
use brier_ops::EvalError;
use parking_lot::{Condvar, Mutex};

/// Where a line is in its lifecycle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LineStatus {
    Unparsed,
    Parsed,
    Evaluating,
    Evaluated,
    Error,
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LineStatus::Unparsed => "unparsed",
            LineStatus::Parsed => "parsed",
            LineStatus::Evaluating => "evaluating",
            LineStatus::Evaluated => "evaluated",
            LineStatus::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Phase {
    Unparsed,
    Parsed(Arc<LineAst>),
    Evaluating {
        ast: Arc<LineAst>,
        owner: ThreadId,
    },
    Evaluated {
        ast: Arc<LineAst>,
        value: Value,
    },
    /// `ast` is `None` when the line did not parse.
    Failed {
        ast: Option<Arc<LineAst>>,
        error: EvalError,
    },
}

impl Phase {
    pub(crate) fn status(&self) -> LineStatus {
        match self {
            Phase::Unparsed => LineStatus::Unparsed,
            Phase::Parsed(_) => LineStatus::Parsed,
            Phase::Evaluating { .. } => LineStatus::Evaluating,
            Phase::Evaluated { .. } => LineStatus::Evaluated,
            Phase::Failed { .. } => LineStatus::Error,
        }
    }

    pub(crate) fn ast(&self) -> Option<&Arc<LineAst>> {
        match self {
            Phase::Unparsed => None,
            Phase::Parsed(ast)
            | Phase::Evaluating { ast, .. }
            | Phase::Evaluated { ast, .. } => Some(ast),
            Phase::Failed { ast, .. } => ast.as_ref(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct LineState {
    pub source: Arc<str>,
    pub phase: Phase,
    /// Bumped on every reset; a result computed for an older generation
    /// is never committed.
    pub generation: u64,
    /// Results committed over the line's lifetime.
    pub evaluations: usize,
}

impl LineState {
    /// Back to `Unparsed` under a fresh generation.
    pub(crate) fn reset(&mut self) {
        self.phase = Phase::Unparsed;
        self.generation += 1;
    }
}

#[derive(Debug)]
pub(crate) struct Line {
    pub index: LineIndex,
    pub state: Mutex<LineState>,
    /// Signalled whenever the line leaves `Evaluating`.
    pub done: Condvar,
}

impl Line {
    pub(crate) fn new(index: LineIndex, source: &str) -> Self {
        Line {
            index,
            state: Mutex::new(LineState {
                source: Arc::from(source),
                phase: Phase::Unparsed,
                generation: 0,
                evaluations: 0,
            }),
            done: Condvar::new(),
        }
    }
}
