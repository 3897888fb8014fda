//! Line AST.
//!
//! One `LineAst` per script line. Expressions are small owned trees; lines
//! refer to each other only through [`LineIndex`] values, never pointers,
//! so the dependency graph is a plain index graph owned by the script.

use std::fmt;
use std::num::NonZeroU32;

use smallvec::SmallVec;

use crate::value::{Scalar, Value};
use crate::visitor::DependencyCollector;

/// 1-based index of a script line.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct LineIndex(NonZeroU32);

impl LineIndex {
    /// The first line.
    pub const FIRST: LineIndex = LineIndex(NonZeroU32::MIN);

    /// Build from a 1-based line number; `None` for 0 or out of range.
    pub fn new(number: usize) -> Option<Self> {
        u32::try_from(number)
            .ok()
            .and_then(NonZeroU32::new)
            .map(LineIndex)
    }

    /// Build from a 0-based slot in the line table.
    pub fn from_slot(slot: usize) -> Option<Self> {
        LineIndex::new(slot.checked_add(1)?)
    }

    /// The 1-based line number.
    #[inline]
    pub fn get(self) -> usize {
        self.0.get() as usize
    }

    /// The 0-based slot in the line table.
    #[inline]
    pub fn slot(self) -> usize {
        self.get() - 1
    }

    /// The line before this one, if any.
    pub fn prev(self) -> Option<Self> {
        LineIndex::new(self.get() - 1)
    }
}

impl fmt::Display for LineIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dependency list of a line: distinct `$N` targets in first-occurrence order.
pub type Deps = SmallVec<[LineIndex; 4]>;

/// A parsed line.
#[derive(Clone, Debug, PartialEq)]
pub struct LineAst {
    pub index: LineIndex,
    pub expr: Expr,
    /// Leading `&`: the line may be evaluated on the worker pool.
    pub parallel: bool,
    deps: Deps,
}

impl LineAst {
    /// Wrap an expression; the dependency list is collected from it.
    pub fn new(index: LineIndex, expr: Expr, parallel: bool) -> Self {
        let deps = DependencyCollector::collect(&expr);
        LineAst {
            index,
            expr,
            parallel,
            deps,
        }
    }

    /// Every line this one references, in first-occurrence order.
    #[inline]
    pub fn deps(&self) -> &[LineIndex] {
        &self.deps
    }
}

impl fmt::Display for LineAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parallel {
            write!(f, "& ")?;
        }
        write!(f, "{}", self.expr)
    }
}

/// An expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Value),
    /// `$N`.
    LineRef(LineIndex),
    /// An input fed through a sequence of operator applications.
    Pipeline(Pipeline),
    /// `!lines` (whole script) or `!lines n` (one line's text).
    Lines(Option<LineIndex>),
    /// `!linesobj n`.
    LinesObj(LineIndex),
    /// `!edit n "text"`.
    Edit { target: LineIndex, text: String },
}

/// `input |> stage | stage || stage ...`
#[derive(Clone, Debug, PartialEq)]
pub struct Pipeline {
    /// `None` only for a command on the first line with no `v=`.
    pub input: Option<Box<Expr>>,
    pub segments: Vec<Segment>,
}

/// How a segment applies its stage to the running value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SegmentMode {
    /// `|>`: rank-polymorphic broadcast.
    Broadcast,
    /// `|`: once per row.
    RowMap,
    /// `||`: once on the whole table.
    WholeTable,
}

impl SegmentMode {
    pub fn pipe(self) -> &'static str {
        match self {
            SegmentMode::Broadcast => "|>",
            SegmentMode::RowMap => "|",
            SegmentMode::WholeTable => "||",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub mode: SegmentMode,
    pub stage: Stage,
}

/// One operator application: operator plus optional operand.
#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub op: OpExpr,
    pub operand: Option<OperandExpr>,
    /// Name the operand was given under (`sep="-"`).
    pub operand_name: Option<String>,
    /// `&`: decompose and map units on the worker pool.
    pub parallel: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OpExpr {
    /// A registered operator.
    Named(String),
    /// `(stage |> stage ...)`: a derived operator.
    Chain(Vec<Stage>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OperandExpr {
    Value(Box<Expr>),
    /// `(stage ...)` in operand position: an operator operand.
    Operator(Vec<Stage>),
}

fn write_stages(f: &mut fmt::Formatter<'_>, stages: &[Stage]) -> fmt::Result {
    write!(f, "(")?;
    for (i, stage) in stages.iter().enumerate() {
        if i > 0 {
            write!(f, " |> ")?;
        }
        write!(f, "{stage}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parallel {
            write!(f, "&")?;
        }
        match &self.op {
            OpExpr::Named(name) => write!(f, "!{name}")?,
            OpExpr::Chain(stages) => write_stages(f, stages)?,
        }
        if self.operand.is_some() {
            write!(f, " ")?;
        }
        if let Some(name) = &self.operand_name {
            write!(f, "{name}=")?;
        }
        match &self.operand {
            None => Ok(()),
            Some(OperandExpr::Value(expr)) => match expr.as_ref() {
                Expr::Pipeline(_) => write!(f, "({expr})"),
                _ => write!(f, "{expr}"),
            },
            Some(OperandExpr::Operator(stages)) => write_stages(f, stages),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Scalar(Scalar::Str(s))) => write!(f, "{s:?}"),
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::LineRef(index) => write!(f, "${index}"),
            Expr::Pipeline(pipeline) => {
                let mut segments = pipeline.segments.iter();
                match &pipeline.input {
                    Some(input) => write!(f, "{input}")?,
                    None => {
                        if let Some(first) = segments.next() {
                            write!(f, "{}", first.stage)?;
                        }
                    }
                }
                for segment in segments {
                    write!(f, " {} {}", segment.mode.pipe(), segment.stage)?;
                }
                Ok(())
            }
            Expr::Lines(None) => write!(f, "!lines"),
            Expr::Lines(Some(index)) => write!(f, "!lines {index}"),
            Expr::LinesObj(index) => write!(f, "!linesobj {index}"),
            Expr::Edit { target, text } => write!(f, "!edit {target} {text:?}"),
        }
    }
}
