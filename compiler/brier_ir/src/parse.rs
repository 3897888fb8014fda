//! Boundary between the script graph and whatever turns text into ASTs.

use std::fmt;

use crate::ast::{LineAst, LineIndex};

/// Byte range within one line's source.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Span { start, end }
    }

    /// Build from a `logos`-style `Range<usize>`, saturating at `u32::MAX`.
    pub fn from_range(range: std::ops::Range<usize>) -> Self {
        let clamp = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        Span::new(clamp(range.start), clamp(range.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A line the parser rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message} at {span}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        ParseError {
            span,
            message: message.into(),
        }
    }
}

/// Turns one line of source text into an AST.
///
/// The script graph only ever talks to this trait; it is shared between
/// worker threads, so implementations must be `Send + Sync`.
pub trait LineParser: Send + Sync {
    fn parse_line(&self, index: LineIndex, source: &str) -> Result<LineAst, ParseError>;
}

impl<F> LineParser for F
where
    F: Fn(LineIndex, &str) -> Result<LineAst, ParseError> + Send + Sync,
{
    fn parse_line(&self, index: LineIndex, source: &str) -> Result<LineAst, ParseError> {
        self(index, source)
    }
}
