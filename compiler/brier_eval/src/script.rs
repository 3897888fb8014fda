//! The script graph.
//!
//! A [`Script`] owns its lines in a flat, index-addressed table and is the
//! only thing that changes line state. The table sits behind a
//! reader/writer lock: reading or committing line state happens under the
//! read lock, an edit's invalidation cascade under the write lock, so no
//! reader ever sees a half-invalidated set of lines.
//!
//! Evaluation itself runs with no table lock held; see `resolve` for how
//! lines are forced and `scheduler` for how `&` lines reach the pool.

use std::collections::VecDeque;
use std::sync::Arc;

use brier_ir::{LineAst, LineIndex, LineParser, Value};
use brier_ops::{global_registry, EvalError, EvalResult, OperatorRegistry};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::config::ScriptConfig;
use crate::graph::Graph;
use crate::line::{Line, LineStatus, Phase};
use crate::scheduler;

/// A parsed, lazily evaluated script.
pub struct Script {
    pub(crate) lines: RwLock<Vec<Arc<Line>>>,
    /// Dependency graph of the current text; cleared by every edit.
    pub(crate) graph: Mutex<Option<Arc<Graph>>>,
    pub(crate) parser: Arc<dyn LineParser>,
    pub(crate) registry: Arc<OperatorRegistry>,
    pub(crate) pool: rayon::ThreadPool,
    pub(crate) config: ScriptConfig,
}

/// Builder for [`Script`].
pub struct ScriptBuilder {
    sources: Vec<String>,
    parser: Arc<dyn LineParser>,
    registry: Option<Arc<OperatorRegistry>>,
    config: ScriptConfig,
}

impl ScriptBuilder {
    pub fn new<I, S>(sources: I, parser: impl LineParser + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptBuilder {
            sources: sources.into_iter().map(Into::into).collect(),
            parser: Arc::new(parser),
            registry: None,
            config: ScriptConfig::default(),
        }
    }

    /// Use `registry` instead of the process-wide built-in registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<OperatorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn config(mut self, config: ScriptConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the worker pool and parse every line.
    pub fn build(self) -> Result<Script, EvalError> {
        let threads = self.config.effective_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("brier-worker-{i}"))
            .build()
            .map_err(|err| EvalError::WorkerPool {
                message: err.to_string(),
            })?;

        let mut lines = Vec::with_capacity(self.sources.len());
        for (slot, source) in self.sources.iter().enumerate() {
            let index = LineIndex::from_slot(slot)
                .ok_or(EvalError::UndefinedLineReference { line: slot + 1 })?;
            lines.push(Arc::new(Line::new(index, source)));
        }

        let script = Script {
            lines: RwLock::new(lines),
            graph: Mutex::new(None),
            parser: self.parser,
            registry: self.registry.unwrap_or_else(global_registry),
            pool,
            config: self.config,
        };
        let graph = script.graph();
        debug!(
            lines = script.len(),
            threads,
            cyclic = graph.cyclic_lines(),
            "script parsed"
        );
        Ok(script)
    }
}

impl Script {
    /// Parse `sources` with `parser` using the built-in operators and the
    /// default configuration.
    pub fn new<I, S>(sources: I, parser: impl LineParser + 'static) -> Result<Script, EvalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptBuilder::new(sources, parser).build()
    }

    pub fn builder<I, S>(sources: I, parser: impl LineParser + 'static) -> ScriptBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptBuilder::new(sources, parser)
    }

    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.read().is_empty()
    }

    pub fn registry(&self) -> &Arc<OperatorRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// Current text of a line.
    pub fn source(&self, index: LineIndex) -> Option<String> {
        let lines = self.lines.read();
        let line = lines.get(index.slot())?;
        let source = line.state.lock().source.to_string();
        Some(source)
    }

    /// Current text of every line.
    pub fn sources(&self) -> Vec<String> {
        let lines = self.lines.read();
        lines
            .iter()
            .map(|line| line.state.lock().source.to_string())
            .collect()
    }

    pub fn status(&self, index: LineIndex) -> Option<LineStatus> {
        self.with_phase(index, Phase::status)
    }

    /// Cached value of an evaluated line. Never evaluates.
    pub fn value(&self, index: LineIndex) -> Option<Value> {
        self.with_phase(index, |phase| match phase {
            Phase::Evaluated { value, .. } => Some(value.clone()),
            _ => None,
        })
        .flatten()
    }

    /// Recorded cause of a failed line.
    pub fn error(&self, index: LineIndex) -> Option<EvalError> {
        self.with_phase(index, |phase| match phase {
            Phase::Failed { error, .. } => Some(error.clone()),
            _ => None,
        })
        .flatten()
    }

    /// How many results the line has committed so far.
    pub fn evaluations(&self, index: LineIndex) -> Option<usize> {
        let lines = self.lines.read();
        let line = lines.get(index.slot())?;
        let evaluations = line.state.lock().evaluations;
        Some(evaluations)
    }

    /// The parsed form of a line. Parses if needed, never evaluates.
    pub fn lines_obj(&self, index: LineIndex) -> Result<Arc<LineAst>, EvalError> {
        let lines = self.lines.read();
        let line = line_at(&lines, index)?;
        let mut state = line.state.lock();
        self.parse_locked(index, &mut state)
    }

    /// Lines `index` references, in first-occurrence order.
    pub fn dependencies(&self, index: LineIndex) -> Result<Vec<LineIndex>, EvalError> {
        self.lines_obj(index).map(|ast| ast.deps().to_vec())
    }

    /// Evaluate a line and everything it depends on.
    ///
    /// When any line in the dependency closure is marked `&`, the closure
    /// goes through the scheduler first; otherwise the line is pulled on
    /// the calling thread.
    pub fn evaluate(&self, index: LineIndex) -> EvalResult {
        let graph = self.graph();
        let closure = graph.closure(&[index]);
        if closure.iter().any(|&line| graph.is_parallel(line)) {
            scheduler::run(self, &graph, &closure);
        }
        self.force(index, &mut Vec::new())
    }

    /// Evaluate every line; results in line order.
    pub fn evaluate_all(&self) -> Vec<EvalResult> {
        let graph = self.graph();
        let all: Vec<LineIndex> = (0..self.len()).filter_map(LineIndex::from_slot).collect();
        scheduler::run(self, &graph, &all);
        all.iter()
            .map(|&index| self.force(index, &mut Vec::new()))
            .collect()
    }

    /// Replace a line's text.
    ///
    /// The line and every line that transitively reads it go back to
    /// `Unparsed` under a new generation; anyone waiting on them is woken.
    /// Returns the invalidated lines in order, empty when `text` equals
    /// the current text.
    pub fn edit(&self, index: LineIndex, text: impl Into<String>) -> Result<Vec<LineIndex>, EvalError> {
        let text = text.into();
        let lines = self.lines.write();
        let target = line_at(&lines, index)?;
        {
            let mut state = target.state.lock();
            if *state.source == *text {
                return Ok(Vec::new());
            }
            state.source = Arc::from(text);
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); lines.len()];
        for (slot, line) in lines.iter().enumerate() {
            let state = line.state.lock();
            for dep in state.phase.ast().map(|ast| ast.deps()).unwrap_or_default() {
                if let Some(readers) = dependents.get_mut(dep.slot()) {
                    readers.push(slot);
                }
            }
        }

        let mut invalid = vec![false; lines.len()];
        let mut queue = VecDeque::from([index.slot()]);
        while let Some(slot) = queue.pop_front() {
            if std::mem::replace(&mut invalid[slot], true) {
                continue;
            }
            queue.extend(dependents[slot].iter().copied().filter(|&reader| !invalid[reader]));
        }

        let mut invalidated = Vec::new();
        for (slot, line) in lines.iter().enumerate().filter(|(slot, _)| invalid[*slot]) {
            line.state.lock().reset();
            line.done.notify_all();
            invalidated.extend(LineIndex::from_slot(slot));
        }
        *self.graph.lock() = None;

        debug!(line = %index, ?invalidated, "edit invalidated lines");
        Ok(invalidated)
    }

    /// The dependency graph, parsing every line first if needed.
    pub(crate) fn graph(&self) -> Arc<Graph> {
        let lines = self.lines.read();
        self.graph_locked(&lines)
    }

    fn with_phase<R>(&self, index: LineIndex, f: impl FnOnce(&Phase) -> R) -> Option<R> {
        let lines = self.lines.read();
        let line = lines.get(index.slot())?;
        let state = line.state.lock();
        Some(f(&state.phase))
    }
}

/// The line at `index`, or `UndefinedLineReference`.
pub(crate) fn line_at(lines: &[Arc<Line>], index: LineIndex) -> Result<&Arc<Line>, EvalError> {
    lines
        .get(index.slot())
        .ok_or(EvalError::UndefinedLineReference { line: index.get() })
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
