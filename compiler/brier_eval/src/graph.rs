//! Static dependency graph of a parsed script.
//!
//! Built from every line's dependency list once all lines are parsed and
//! shared until the next edit. Cycles are found here, up front, so that a
//! line's outcome depends only on the graph and never on which thread got
//! to which line first.

use std::sync::Arc;

use brier_ir::{Deps, LineIndex};
use rustc_hash::FxHashMap;

use crate::config::ScriptConfig;
use crate::stack::ensure_sufficient_stack;

/// One line as the graph sees it.
#[derive(Clone, Debug, Default)]
pub(crate) struct Node {
    /// Empty for lines that failed to parse.
    pub deps: Deps,
    pub parallel: bool,
}

#[derive(Debug)]
pub(crate) struct Graph {
    nodes: Vec<Node>,
    /// Members of every non-trivial strongly connected component, mapped to
    /// the sorted component.
    cycles: FxHashMap<LineIndex, Arc<[LineIndex]>>,
}

impl Graph {
    pub(crate) fn new(nodes: Vec<Node>, config: &ScriptConfig) -> Self {
        let mut graph = Graph {
            nodes,
            cycles: FxHashMap::default(),
        };
        graph.cycles = Tarjan::run(&graph, config);
        graph
    }

    pub(crate) fn is_parallel(&self, index: LineIndex) -> bool {
        self.nodes.get(index.slot()).is_some_and(|node| node.parallel)
    }

    /// Number of lines on some cycle.
    pub(crate) fn cyclic_lines(&self) -> usize {
        self.cycles.len()
    }

    /// The sorted cycle `index` belongs to, if any.
    pub(crate) fn cycle(&self, index: LineIndex) -> Option<&Arc<[LineIndex]>> {
        self.cycles.get(&index)
    }

    /// In-range dependencies of a slot, as slots.
    fn edges(&self, slot: usize) -> impl Iterator<Item = usize> + '_ {
        let len = self.nodes.len();
        self.nodes[slot]
            .deps
            .iter()
            .map(|dep| dep.slot())
            .filter(move |&dep| dep < len)
    }

    /// Every line reachable from `roots`, roots included, in line order.
    pub(crate) fn closure(&self, roots: &[LineIndex]) -> Vec<LineIndex> {
        let mut seen = vec![false; self.nodes.len()];
        let mut work: Vec<usize> = roots
            .iter()
            .map(|root| root.slot())
            .filter(|&slot| slot < self.nodes.len())
            .collect();
        while let Some(slot) = work.pop() {
            if std::mem::replace(&mut seen[slot], true) {
                continue;
            }
            work.extend(self.edges(slot).filter(|&dep| !seen[dep]));
        }
        (0..seen.len())
            .filter(|&slot| seen[slot])
            .filter_map(LineIndex::from_slot)
            .collect()
    }

    /// Split `lines` into dependency levels (Kahn's algorithm).
    ///
    /// Every line in a level depends only on lines in earlier levels or
    /// outside `lines`. Lines in or behind a cycle never become ready and
    /// are returned separately, in line order.
    pub(crate) fn levels(&self, lines: &[LineIndex]) -> (Vec<Vec<LineIndex>>, Vec<LineIndex>) {
        let len = self.nodes.len();
        let mut member = vec![false; len];
        for line in lines {
            if let Some(slot) = member.get_mut(line.slot()) {
                *slot = true;
            }
        }

        let mut indegree = vec![0usize; len];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); len];
        for slot in (0..len).filter(|&slot| member[slot]) {
            for dep in self.edges(slot).filter(|&dep| member[dep]) {
                indegree[slot] += 1;
                dependents[dep].push(slot);
            }
        }

        let mut levels = Vec::new();
        let mut placed = vec![false; len];
        let mut ready: Vec<usize> = (0..len)
            .filter(|&slot| member[slot] && indegree[slot] == 0)
            .collect();
        while !ready.is_empty() {
            let mut next = Vec::new();
            for &slot in &ready {
                placed[slot] = true;
                for &dependent in &dependents[slot] {
                    indegree[dependent] -= 1;
                    if indegree[dependent] == 0 {
                        next.push(dependent);
                    }
                }
            }
            next.sort_unstable();
            levels.push(ready.iter().filter_map(|&slot| LineIndex::from_slot(slot)).collect());
            ready = next;
        }

        let leftover = (0..len)
            .filter(|&slot| member[slot] && !placed[slot])
            .filter_map(LineIndex::from_slot)
            .collect();
        (levels, leftover)
    }
}

/// Tarjan's strongly connected components.
struct Tarjan<'g> {
    graph: &'g Graph,
    config: &'g ScriptConfig,
    order: Vec<Option<usize>>,
    low: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next: usize,
    cycles: FxHashMap<LineIndex, Arc<[LineIndex]>>,
}

impl<'g> Tarjan<'g> {
    fn run(graph: &'g Graph, config: &'g ScriptConfig) -> FxHashMap<LineIndex, Arc<[LineIndex]>> {
        let len = graph.nodes.len();
        let mut tarjan = Tarjan {
            graph,
            config,
            order: vec![None; len],
            low: vec![0; len],
            on_stack: vec![false; len],
            stack: Vec::new(),
            next: 0,
            cycles: FxHashMap::default(),
        };
        for slot in 0..len {
            if tarjan.order[slot].is_none() {
                tarjan.visit(slot);
            }
        }
        tarjan.cycles
    }

    fn visit(&mut self, slot: usize) {
        let config = self.config;
        ensure_sufficient_stack(config, || self.visit_inner(slot));
    }

    fn visit_inner(&mut self, slot: usize) {
        let graph = self.graph;
        self.order[slot] = Some(self.next);
        self.low[slot] = self.next;
        self.next += 1;
        self.stack.push(slot);
        self.on_stack[slot] = true;

        let mut self_loop = false;
        for dep in graph.edges(slot) {
            self_loop |= dep == slot;
            match self.order[dep] {
                None => {
                    self.visit(dep);
                    self.low[slot] = self.low[slot].min(self.low[dep]);
                }
                Some(order) if self.on_stack[dep] => {
                    self.low[slot] = self.low[slot].min(order);
                }
                Some(_) => {}
            }
        }

        if Some(self.low[slot]) != self.order[slot] {
            return;
        }
        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack[member] = false;
            component.push(member);
            if member == slot {
                break;
            }
        }
        if component.len() > 1 || self_loop {
            component.sort_unstable();
            let cycle: Arc<[LineIndex]> = component
                .iter()
                .filter_map(|&member| LineIndex::from_slot(member))
                .collect();
            for line in cycle.iter() {
                self.cycles.insert(*line, Arc::clone(&cycle));
            }
        }
    }
}
