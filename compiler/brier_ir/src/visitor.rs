//! AST visitor.
//!
//! Default implementations call the `walk_*` functions, which traverse
//! children in source order. Override `visit_*` methods to observe nodes.

use crate::ast::{Deps, Expr, LineIndex, OpExpr, OperandExpr, Stage};

pub trait Visitor<'ast> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_stage(&mut self, stage: &'ast Stage) {
        walk_stage(self, stage);
    }

    /// A `$N` occurrence.
    fn visit_line_ref(&mut self, index: LineIndex) {
        let _ = index;
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    match expr {
        Expr::LineRef(index) => visitor.visit_line_ref(*index),
        Expr::Pipeline(pipeline) => {
            if let Some(input) = &pipeline.input {
                visitor.visit_expr(input);
            }
            for segment in &pipeline.segments {
                visitor.visit_stage(&segment.stage);
            }
        }
        // intrinsic line arguments are literal indices, not references
        Expr::Literal(_) | Expr::Lines(_) | Expr::LinesObj(_) | Expr::Edit { .. } => {}
    }
}

pub fn walk_stage<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, stage: &'ast Stage) {
    if let OpExpr::Chain(stages) = &stage.op {
        for inner in stages {
            visitor.visit_stage(inner);
        }
    }
    match &stage.operand {
        Some(OperandExpr::Value(expr)) => visitor.visit_expr(expr),
        Some(OperandExpr::Operator(stages)) => {
            for inner in stages {
                visitor.visit_stage(inner);
            }
        }
        None => {}
    }
}

/// Collects the distinct `$N` targets of an expression.
#[derive(Default)]
pub struct DependencyCollector {
    deps: Deps,
}

impl DependencyCollector {
    pub fn collect(expr: &Expr) -> Deps {
        let mut collector = DependencyCollector::default();
        collector.visit_expr(expr);
        collector.deps
    }
}

impl Visitor<'_> for DependencyCollector {
    fn visit_line_ref(&mut self, index: LineIndex) {
        if !self.deps.contains(&index) {
            self.deps.push(index);
        }
    }
}
