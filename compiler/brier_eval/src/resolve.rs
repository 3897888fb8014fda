//! Reference resolver.
//!
//! Forcing a line returns its cached outcome or computes it. A line is
//! computed at most once per generation: the first requester moves it to
//! `Evaluating` and everyone else waits on the line's condvar. Every
//! dependency is resolved, in first-occurrence order, before the line's
//! expression runs.
//!
//! Lines on a cycle of the static graph fail with `CyclicReference`
//! before anything is evaluated, so they never wait on each other.

use std::sync::Arc;
use std::thread;

use brier_ir::{LineAst, LineIndex};
use brier_ops::{EvalError, EvalResult};
use tracing::{debug, warn};

use crate::eval::{Env, Evaluator};
use crate::graph::{Graph, Node};
use crate::line::{Line, LineState, Phase};
use crate::script::{line_at, Script};
use crate::stack::ensure_sufficient_stack;

/// What to do with a line after looking at its state.
enum Next {
    Done(EvalResult),
    /// Another thread is computing it.
    Wait,
    /// This thread is already computing it further down its stack, under
    /// a different request (work stolen while blocked in the pool). Waiting
    /// would deadlock on ourselves, so the line runs again here without
    /// committing; the owner below commits. The only effect a line can
    /// have is `!edit`, and repeating an edit with the same text is a no-op.
    Inline(Arc<LineAst>),
    Start,
}

/// Owns a line while this thread evaluates it.
///
/// If the evaluation unwinds, the drop settles the line as failed so that
/// threads waiting on it wake up instead of blocking forever.
struct EvaluatingGuard<'s> {
    script: &'s Script,
    line: Arc<Line>,
    generation: u64,
    /// `None` once the result has been handed to `commit`.
    ast: Option<Arc<LineAst>>,
}

impl EvaluatingGuard<'_> {
    /// Commit `result`; false when the line was edited meanwhile.
    fn finish(mut self, result: &EvalResult) -> bool {
        match self.ast.take() {
            Some(ast) => self.script.commit(&self.line, self.generation, ast, result),
            None => false,
        }
    }
}

impl Drop for EvaluatingGuard<'_> {
    fn drop(&mut self) {
        if let Some(ast) = self.ast.take() {
            warn!(line = %self.line.index, "evaluation panicked; failing the line");
            let error = EvalError::Panicked {
                line: self.line.index,
            };
            self.script.commit(&self.line, self.generation, ast, &Err(error));
        }
    }
}

impl Script {
    /// Resolve `index`, computing it if needed.
    ///
    /// `stack` holds the lines this request is currently computing.
    pub(crate) fn force(&self, index: LineIndex, stack: &mut Vec<LineIndex>) -> EvalResult {
        let me = thread::current().id();
        loop {
            let lines = self.lines.read();
            let line = Arc::clone(line_at(&lines, index)?);
            let graph = self.graph_locked(&lines);

            if let Some(pos) = stack.iter().position(|&entry| entry == index) {
                let cycle = graph.cycle(index).map_or_else(
                    || {
                        let mut cycle = stack[pos..].to_vec();
                        cycle.sort_unstable();
                        cycle
                    },
                    |cycle| cycle.to_vec(),
                );
                return Err(EvalError::CyclicReference { cycle });
            }

            let mut state = line.state.lock();
            let next = match &state.phase {
                Phase::Evaluated { value, .. } => Next::Done(Ok(value.clone())),
                Phase::Failed { error, .. } => Next::Done(Err(error.clone())),
                Phase::Evaluating { owner, .. } if *owner != me => Next::Wait,
                Phase::Evaluating { ast, .. } => Next::Inline(Arc::clone(ast)),
                Phase::Unparsed | Phase::Parsed(_) => Next::Start,
            };
            match next {
                Next::Done(result) => return result,
                Next::Wait => {
                    drop(lines);
                    line.done.wait(&mut state);
                    continue;
                }
                Next::Inline(ast) => {
                    drop(state);
                    drop(lines);
                    return self.run_line(index, &ast, stack);
                }
                Next::Start => {}
            }

            let ast = self.parse_locked(index, &mut state)?;
            if let Some(cycle) = graph.cycle(index) {
                let error = EvalError::CyclicReference {
                    cycle: cycle.to_vec(),
                };
                Self::settle_locked(&line, &mut state, Phase::Failed {
                    ast: Some(ast),
                    error: error.clone(),
                });
                debug!(line = %index, "line is on a cycle");
                return Err(error);
            }

            let generation = state.generation;
            state.phase = Phase::Evaluating {
                ast: Arc::clone(&ast),
                owner: me,
            };
            drop(state);
            drop(lines);

            debug!(line = %index, generation, "evaluating line");
            let guard = EvaluatingGuard {
                script: self,
                line,
                generation,
                ast: Some(Arc::clone(&ast)),
            };
            let result = self.run_line(index, &ast, stack);
            if guard.finish(&result) {
                return result;
            }
            warn!(line = %index, generation, "line was edited during evaluation; discarding result");
        }
    }

    /// Resolve the line's dependencies, then run its expression.
    fn run_line(&self, index: LineIndex, ast: &LineAst, stack: &mut Vec<LineIndex>) -> EvalResult {
        ensure_sufficient_stack(&self.config, || {
            stack.push(index);
            let result = self
                .resolve_deps(index, ast, stack)
                .and_then(|env| Evaluator::new(self, &env).eval(&ast.expr));
            stack.pop();
            result
        })
    }

    fn resolve_deps(&self, index: LineIndex, ast: &LineAst, stack: &mut Vec<LineIndex>) -> Result<Env, EvalError> {
        let len = self.len();
        let mut env = Env::with_capacity(ast.deps().len());
        for &dep in ast.deps() {
            if dep.get() > len {
                return Err(EvalError::UndefinedLineReference { line: dep.get() });
            }
            match self.force(dep, stack) {
                Ok(value) => env.push((dep, value)),
                Err(EvalError::CyclicReference { cycle }) if cycle.contains(&index) => {
                    return Err(EvalError::CyclicReference { cycle });
                }
                Err(_) => return Err(EvalError::DependencyFailed { line: dep }),
            }
        }
        Ok(env)
    }

    /// Store a finished result unless the line was reset meanwhile.
    fn commit(&self, line: &Line, generation: u64, ast: Arc<LineAst>, result: &EvalResult) -> bool {
        let _lines = self.lines.read();
        let mut state = line.state.lock();
        if state.generation != generation {
            return false;
        }
        let phase = match result {
            Ok(value) => Phase::Evaluated {
                ast,
                value: value.clone(),
            },
            Err(error) => Phase::Failed {
                ast: Some(ast),
                error: error.clone(),
            },
        };
        Self::settle_locked(line, &mut state, phase);
        debug!(line = %line.index, ok = result.is_ok(), "committed line");
        true
    }

    fn settle_locked(line: &Line, state: &mut LineState, phase: Phase) {
        state.phase = phase;
        state.evaluations += 1;
        line.done.notify_all();
    }

    /// Parse an `Unparsed` line; return its AST or its parse error.
    pub(crate) fn parse_locked(&self, index: LineIndex, state: &mut LineState) -> Result<Arc<LineAst>, EvalError> {
        if let Some(ast) = state.phase.ast() {
            return Ok(Arc::clone(ast));
        }
        if let Phase::Failed { error, .. } = &state.phase {
            return Err(error.clone());
        }
        match self.parser.parse_line(index, &state.source) {
            Ok(ast) => {
                let ast = Arc::new(ast);
                state.phase = Phase::Parsed(Arc::clone(&ast));
                Ok(ast)
            }
            Err(err) => {
                let error = EvalError::Parse {
                    line: index,
                    message: err.to_string(),
                };
                state.phase = Phase::Failed {
                    ast: None,
                    error: error.clone(),
                };
                Err(error)
            }
        }
    }

    /// The cached graph, or a fresh one after parsing every line.
    ///
    /// Called with the table read lock held, so no edit can slip in
    /// between building the graph and caching it.
    pub(crate) fn graph_locked(&self, lines: &[Arc<Line>]) -> Arc<Graph> {
        if let Some(graph) = self.graph.lock().as_ref() {
            return Arc::clone(graph);
        }
        let nodes = lines
            .iter()
            .map(|line| {
                let mut state = line.state.lock();
                match self.parse_locked(line.index, &mut state) {
                    Ok(ast) => Node {
                        deps: ast.deps().into(),
                        parallel: ast.parallel,
                    },
                    Err(_) => Node::default(),
                }
            })
            .collect();
        let graph = Arc::new(Graph::new(nodes, &self.config));
        *self.graph.lock() = Some(Arc::clone(&graph));
        graph
    }
}
