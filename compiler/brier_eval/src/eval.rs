//! Expression evaluator.
//!
//! Runs one line's expression once its dependencies are resolved. `$N`
//! reads from the resolved environment; operator applications go through
//! the dispatcher, the row/table processor, or the chain compiler.

use brier_ir::{Expr, LineAst, LineIndex, OpExpr, OperandExpr, Pipeline, Scalar, Segment, SegmentMode, Stage, Value};
use brier_ops::{apply_with, row_map, whole_table, BoundStage, Chain, EvalError, EvalResult, Operand, Operator};
use smallvec::SmallVec;

use crate::script::Script;

/// Values of a line's dependencies, in first-occurrence order.
pub(crate) type Env = SmallVec<[(LineIndex, Value); 4]>;

pub(crate) struct Evaluator<'a> {
    script: &'a Script,
    env: &'a [(LineIndex, Value)],
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(script: &'a Script, env: &'a [(LineIndex, Value)]) -> Self {
        Evaluator { script, env }
    }

    pub(crate) fn eval(&self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::LineRef(line) => self.lookup(*line),
            Expr::Pipeline(pipeline) => self.eval_pipeline(pipeline),
            Expr::Lines(None) => Ok(Value::list(
                self.script.sources().into_iter().map(Scalar::from).collect(),
            )),
            Expr::Lines(Some(line)) => self
                .script
                .source(*line)
                .map(Value::from)
                .ok_or(EvalError::UndefinedLineReference { line: line.get() }),
            Expr::LinesObj(line) => self.script.lines_obj(*line).map(|ast| lines_obj_value(&ast)),
            Expr::Edit { target, text } => {
                self.script.edit(*target, text.as_str())?;
                Ok(Value::str(text))
            }
        }
    }

    fn lookup(&self, line: LineIndex) -> EvalResult {
        self.env
            .iter()
            .find(|(dep, _)| *dep == line)
            .map(|(_, value)| value.clone())
            .ok_or(EvalError::UndefinedLineReference { line: line.get() })
    }

    fn eval_pipeline(&self, pipeline: &Pipeline) -> EvalResult {
        let Some(input) = &pipeline.input else {
            let op = pipeline
                .segments
                .first()
                .map(|segment| stage_name(&segment.stage))
                .unwrap_or_default();
            return Err(EvalError::MissingArgument { op });
        };
        let mut value = self.eval(input)?;
        for segment in &pipeline.segments {
            value = self.apply_segment(segment, &value)?;
        }
        Ok(value)
    }

    fn apply_segment(&self, segment: &Segment, arg: &Value) -> EvalResult {
        let stage = &segment.stage;
        let op = self.stage_operator(stage)?;
        let operand = self.operand(stage.operand.as_ref())?;
        let run = || match segment.mode {
            SegmentMode::Broadcast => apply_with(&op, arg, operand.as_ref(), stage.parallel),
            SegmentMode::RowMap => row_map(&op, arg, operand.as_ref(), stage.parallel),
            SegmentMode::WholeTable => whole_table(&op, arg, operand.as_ref()),
        };
        if uses_pool(stage) {
            self.script.pool.install(run)
        } else {
            run()
        }
    }

    /// The stage's operator, checked against the name its operand was given under.
    fn stage_operator(&self, stage: &Stage) -> Result<Operator, EvalError> {
        let op = self.operator(&stage.op)?;
        if let Some(name) = &stage.operand_name {
            op.check_operand_name(name)?;
        }
        Ok(op)
    }

    fn operator(&self, op: &OpExpr) -> Result<Operator, EvalError> {
        match op {
            OpExpr::Named(name) => self.script.registry.lookup(name).map(Operator::Named),
            OpExpr::Chain(stages) => Chain::compile_operator(self.bind(stages)?),
        }
    }

    fn operand(&self, operand: Option<&OperandExpr>) -> Result<Option<Operand>, EvalError> {
        match operand {
            None => Ok(None),
            Some(OperandExpr::Value(expr)) => self.eval(expr).map(|value| Some(Operand::Value(value))),
            Some(OperandExpr::Operator(stages)) => {
                Chain::compile_operator(self.bind(stages)?).map(|op| Some(Operand::Operator(op)))
            }
        }
    }

    fn bind(&self, stages: &[Stage]) -> Result<Vec<BoundStage>, EvalError> {
        stages
            .iter()
            .map(|stage| {
                let op = self.stage_operator(stage)?;
                let operand = self.operand(stage.operand.as_ref())?;
                Ok(BoundStage::new(op, operand).parallel(stage.parallel))
            })
            .collect()
    }
}

/// Whether any part of a stage asks for the worker pool.
fn uses_pool(stage: &Stage) -> bool {
    stage.parallel
        || matches!(&stage.op, OpExpr::Chain(stages) if stages.iter().any(uses_pool))
        || matches!(&stage.operand, Some(OperandExpr::Operator(stages)) if stages.iter().any(uses_pool))
}

fn stage_name(stage: &Stage) -> String {
    match &stage.op {
        OpExpr::Named(name) => name.clone(),
        OpExpr::Chain(_) => stage.to_string(),
    }
}

/// `!linesobj`: a line's parsed form as a dict.
fn lines_obj_value(ast: &LineAst) -> Value {
    let deps = ast
        .deps()
        .iter()
        .map(|dep| format!("${dep}"))
        .collect::<Vec<_>>()
        .join(" ");
    Value::dict_from([
        ("line", Scalar::Int(i64::try_from(ast.index.get()).unwrap_or(i64::MAX))),
        ("parallel", Scalar::Int(i64::from(ast.parallel))),
        ("deps", Scalar::from(deps)),
        ("expr", Scalar::from(ast.expr.to_string())),
    ])
}
