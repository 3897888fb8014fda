//! Parallel scheduler.
//!
//! Splits the dependency closure of the requested lines into levels. Within
//! a level, `&` lines are spawned on the worker pool while the rest run on
//! the requesting thread; the next level starts once the whole level is
//! settled. Lines in or behind a cycle never reach a level and are forced
//! last, sequentially.
//!
//! The scheduler only decides *where* a line is forced. Outcomes are cached
//! by the resolver, which guarantees one evaluation per generation no
//! matter how many threads ask.

use brier_ir::LineIndex;
use tracing::{debug, trace};

use crate::graph::Graph;
use crate::script::Script;

pub(crate) fn run(script: &Script, graph: &Graph, roots: &[LineIndex]) {
    let closure = graph.closure(roots);
    let (levels, leftover) = graph.levels(&closure);

    for (depth, level) in levels.iter().enumerate() {
        let (marked, unmarked): (Vec<LineIndex>, Vec<LineIndex>) =
            level.iter().partition(|line| graph.is_parallel(**line));
        if marked.is_empty() {
            unmarked.iter().for_each(|&line| settle(script, line));
            continue;
        }
        debug!(
            level = depth,
            parallel = marked.len(),
            sequential = unmarked.len(),
            "dispatching level to the worker pool"
        );
        script.pool.in_place_scope(|scope| {
            for &line in &marked {
                scope.spawn(move |_| settle(script, line));
            }
            for &line in &unmarked {
                settle(script, line);
            }
        });
    }

    if !leftover.is_empty() {
        debug!(lines = leftover.len(), "forcing cyclic lines");
    }
    for line in leftover {
        settle(script, line);
    }
}

/// Force one line; its outcome stays cached on the line.
fn settle(script: &Script, line: LineIndex) {
    if let Err(error) = script.force(line, &mut Vec::new()) {
        trace!(line = %line, %error, "line failed");
    }
}
