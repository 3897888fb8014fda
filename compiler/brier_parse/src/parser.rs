//! Recursive-descent line parser.
//!
//! Each script line is parsed on its own. Lines that start with an
//! expression sigil must parse; anything else that fails to parse is the
//! line's literal text.

use brier_ir::{
    Dict, Expr, LineAst, LineIndex, LineParser, OpExpr, OperandExpr, ParseError, Pipeline, Scalar,
    Segment, SegmentMode, Span, Stage, Value,
};

use crate::lexer::{lex, Token};

/// Name of the argument that supplies a command's input.
const INPUT_ARG: &str = "v";

/// Characters that commit a line to being an expression.
const SIGILS: &[char] = &['!', '$', '(', '[', '{', '"', '?'];

/// The default line parser.
#[derive(Copy, Clone, Debug, Default)]
pub struct BrierParser;

impl LineParser for BrierParser {
    fn parse_line(&self, index: LineIndex, source: &str) -> Result<LineAst, ParseError> {
        parse_line(index, source)
    }
}

/// Parse one script line.
pub fn parse_line(index: LineIndex, source: &str) -> Result<LineAst, ParseError> {
    let mut body = source.trim();
    let parallel = body.starts_with('&');
    if parallel {
        body = body[1..].trim_start();
    }

    if body.is_empty() || body.starts_with('#') {
        return Ok(LineAst::new(index, pass_through(index), parallel));
    }

    let parsed = lex(body).and_then(|tokens| Parser::new(index, &tokens, body.len()).parse_all());
    let expr = match parsed {
        Ok(expr) => expr,
        Err(err) if body.starts_with(SIGILS) => return Err(err),
        Err(_) => Expr::Literal(Value::str(body)),
    };
    Ok(LineAst::new(index, expr, parallel))
}

/// The previous line's value, or an empty string on the first line.
fn pass_through(index: LineIndex) -> Expr {
    index
        .prev()
        .map_or_else(|| Expr::Literal(Value::str("")), Expr::LineRef)
}

/// Parser state.
struct Parser<'t> {
    /// Line being parsed; commands without `v=` read the line before it.
    index: LineIndex,
    tokens: &'t [(Token, Span)],
    pos: usize,
    /// Span reported at end of input.
    end: Span,
}

/// Parsed `name=value` / positional arguments of a command or stage.
#[derive(Default)]
struct Args {
    input: Option<Expr>,
    operand: Option<OperandExpr>,
    /// `name` of a `name=value` operand.
    operand_name: Option<String>,
    /// Parenthesised stage groups, in order (only `!chain` keeps several).
    stage_groups: Vec<Vec<Stage>>,
}

impl<'t> Parser<'t> {
    fn new(index: LineIndex, tokens: &'t [(Token, Span)], len: usize) -> Self {
        let end = u32::try_from(len).unwrap_or(u32::MAX);
        Parser {
            index,
            tokens,
            pos: 0,
            end: Span::new(end, end),
        }
    }

    fn parse_all(mut self) -> Result<Expr, ParseError> {
        let expr = self.expression()?;
        match self.current() {
            None => Ok(expr),
            Some(token) => Err(self.error(&format!("unexpected {}", token.describe()))),
        }
    }

    // ===== Token access =====

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + offset).map(|(token, _)| token)
    }

    fn current_span(&self) -> Span {
        self.tokens.get(self.pos).map_or(self.end, |(_, span)| *span)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.current();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &Token) -> bool {
        self.current()
            .is_some_and(|token| std::mem::discriminant(token) == std::mem::discriminant(kind))
    }

    fn consume(&mut self, kind: &Token, msg: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(msg))
        }
    }

    fn error(&self, msg: &str) -> ParseError {
        ParseError::new(self.current_span(), msg)
    }

    // ===== Expressions =====

    /// `additive (pipe stage)*`
    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.additive()?;
        while let Some(mode) = self.pipe() {
            self.advance();
            let stage = self.stage()?;
            push_segment(&mut expr, mode, stage);
        }
        Ok(expr)
    }

    fn pipe(&self) -> Option<SegmentMode> {
        match self.current()? {
            Token::PipeGt => Some(SegmentMode::Broadcast),
            Token::Pipe => Some(SegmentMode::RowMap),
            Token::PipePipe => Some(SegmentMode::WholeTable),
            _ => None,
        }
    }

    /// `primary ('+' primary)*`
    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while self.check(&Token::Plus) {
            self.advance();
            let rhs = self.primary()?;
            let stage = Stage {
                op: OpExpr::Named("+".to_string()),
                operand: Some(OperandExpr::Value(Box::new(rhs))),
                operand_name: None,
                parallel: false,
            };
            push_segment(&mut expr, SegmentMode::Broadcast, stage);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.current() else {
            return Err(self.error("expected an expression"));
        };
        match token {
            Token::Int(_) | Token::Float(_) | Token::Str(_) => {
                let scalar = self.scalar()?;
                Ok(Expr::Literal(Value::Scalar(scalar)))
            }
            Token::LineRef(n) => {
                let index = self.line_number(*n)?;
                self.advance();
                Ok(Expr::LineRef(index))
            }
            Token::LBracket | Token::LBrace => self.literal().map(Expr::Literal),
            Token::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(&Token::RParen, "expected `)`")?;
                Ok(expr)
            }
            Token::Bang => self.command(),
            Token::Question => Err(self.error("`?` queries are not supported")),
            other => Err(self.error(&format!("expected an expression, found {}", other.describe()))),
        }
    }

    fn line_number(&self, n: usize) -> Result<LineIndex, ParseError> {
        if n == 0 {
            return Err(self.error("line numbers start at 1"));
        }
        LineIndex::new(n).ok_or_else(|| self.error(&format!("line number {n} is out of range")))
    }

    // ===== Literals =====

    fn scalar(&mut self) -> Result<Scalar, ParseError> {
        let scalar = match self.current() {
            Some(Token::Int(n)) => Scalar::Int(*n),
            Some(Token::Float(x)) => Scalar::Float(*x),
            Some(Token::Str(s)) => Scalar::str(s),
            _ => return Err(self.error("expected a number or string")),
        };
        self.advance();
        Ok(scalar)
    }

    /// `[...]` or `{...}`.
    fn literal(&mut self) -> Result<Value, ParseError> {
        match self.current() {
            Some(Token::LBrace) => self.dict().map(Value::dict),
            Some(Token::LBracket) => self.list(),
            _ => Err(self.error("expected `[` or `{`")),
        }
    }

    /// `{key: scalar, ...}`; keys are names or strings.
    fn dict(&mut self) -> Result<Dict, ParseError> {
        self.consume(&Token::LBrace, "expected `{`")?;
        let mut dict = Dict::new();
        while !self.check(&Token::RBrace) {
            let key = match self.advance() {
                Some(Token::Name(name) | Token::Str(name)) => name.clone(),
                _ => return Err(self.error("expected a key")),
            };
            self.consume(&Token::Colon, "expected `:`")?;
            let value = self.scalar()?;
            dict.insert(key, value);
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.consume(&Token::RBrace, "expected `}`")?;
        Ok(dict)
    }

    /// `[...]`: scalars make a list, dicts a table, lists a box.
    fn list(&mut self) -> Result<Value, ParseError> {
        let start = self.current_span();
        self.consume(&Token::LBracket, "expected `[`")?;
        let mut items = Vec::new();
        while !self.check(&Token::RBracket) {
            items.push(match self.current() {
                Some(Token::LBracket | Token::LBrace) => self.literal()?,
                _ => Value::Scalar(self.scalar()?),
            });
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.consume(&Token::RBracket, "expected `]`")?;

        let mixed = || ParseError::new(start, "list elements must all be the same kind");
        match items.first() {
            None | Some(Value::Scalar(_)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Scalar(s) => Ok(s),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::list),
            Some(Value::Dict(_)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Dict(d) => Ok(d.as_ref().clone()),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::table),
            Some(Value::List(_)) => items
                .into_iter()
                .map(|item| match item {
                    Value::List(l) => Ok(l.as_ref().clone()),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::boxed),
            Some(_) => Err(ParseError::new(start, "lists nest at most one level")),
        }
    }

    // ===== Commands and stages =====

    /// `'!' NAME args`
    fn command(&mut self) -> Result<Expr, ParseError> {
        self.consume(&Token::Bang, "expected `!`")?;
        let name_span = self.current_span();
        let name = match self.advance() {
            Some(Token::Name(name)) => name.as_str(),
            Some(Token::Plus) => "+",
            _ => return Err(ParseError::new(name_span, "expected an operator name after `!`")),
        };

        match name {
            "lines" => {
                let target = self.optional_line_number()?;
                Ok(Expr::Lines(target))
            }
            "linesobj" => {
                let target = self
                    .optional_line_number()?
                    .ok_or_else(|| self.error("`!linesobj` needs a line number"))?;
                Ok(Expr::LinesObj(target))
            }
            "edit" => {
                let target = self
                    .optional_line_number()?
                    .ok_or_else(|| self.error("`!edit` needs a line number"))?;
                let text = match self.advance() {
                    Some(Token::Str(text)) => text.clone(),
                    _ => return Err(self.error("`!edit` needs the new text as a string")),
                };
                Ok(Expr::Edit { target, text })
            }
            "chain" => {
                let args = self.args(true)?;
                if args.stage_groups.is_empty() {
                    return Err(ParseError::new(name_span, "`!chain` needs at least one stage"));
                }
                let stages = args.stage_groups.into_iter().map(group_stage).collect();
                let stage = Stage {
                    op: OpExpr::Chain(stages),
                    operand: args.operand,
                    operand_name: args.operand_name,
                    parallel: false,
                };
                Ok(self.command_pipeline(args.input, stage))
            }
            _ => {
                let args = self.args(false)?;
                let stage = Stage {
                    op: OpExpr::Named(name.to_string()),
                    operand: args.operand,
                    operand_name: args.operand_name,
                    parallel: false,
                };
                Ok(self.command_pipeline(args.input, stage))
            }
        }
    }

    /// A command's input is `v=` if given, else the previous line.
    fn command_pipeline(&self, input: Option<Expr>, stage: Stage) -> Expr {
        let input = input.or_else(|| self.index.prev().map(Expr::LineRef));
        Expr::Pipeline(Pipeline {
            input: input.map(Box::new),
            segments: vec![Segment {
                mode: SegmentMode::Broadcast,
                stage,
            }],
        })
    }

    fn optional_line_number(&mut self) -> Result<Option<LineIndex>, ParseError> {
        match self.current() {
            Some(Token::Int(n)) => {
                let n = usize::try_from(*n).map_err(|_| self.error("line numbers start at 1"))?;
                let index = self.line_number(n)?;
                self.advance();
                Ok(Some(index))
            }
            _ => Ok(None),
        }
    }

    /// `['&'] ['!'] (NAME | '+' | '(' stages ')') args`
    fn stage(&mut self) -> Result<Stage, ParseError> {
        let parallel = self.check(&Token::Amp);
        if parallel {
            self.advance();
        }
        if self.check(&Token::Bang) {
            self.advance();
        }
        let op = match self.current() {
            Some(Token::Name(name)) => {
                let op = OpExpr::Named(name.clone());
                self.advance();
                op
            }
            Some(Token::Plus) => {
                self.advance();
                OpExpr::Named("+".to_string())
            }
            Some(Token::LParen) => {
                let stages = self.stage_group()?;
                OpExpr::Chain(stages)
            }
            Some(Token::Question) => return Err(self.error("`?` queries are not supported")),
            _ => return Err(self.error("expected an operator")),
        };
        let args = self.args(false)?;
        if args.input.is_some() {
            return Err(self.error("`v=` is only allowed on a command"));
        }
        Ok(Stage {
            op,
            operand: args.operand,
            operand_name: args.operand_name,
            parallel,
        })
    }

    /// `'(' stage ('|>' stage)* ')'`
    fn stage_group(&mut self) -> Result<Vec<Stage>, ParseError> {
        self.consume(&Token::LParen, "expected `(`")?;
        let mut stages = vec![self.stage()?];
        while self.check(&Token::PipeGt) {
            self.advance();
            stages.push(self.stage()?);
        }
        self.consume(&Token::RParen, "expected `)`")?;
        Ok(stages)
    }

    /// Whether a `(` at the current position opens a stage group rather
    /// than a parenthesised expression.
    fn at_stage_group(&self) -> bool {
        matches!(self.current(), Some(Token::LParen))
            && matches!(
                self.peek(1),
                Some(Token::Name(_) | Token::Plus | Token::Bang | Token::Amp | Token::LParen)
            )
    }

    /// `(NAME '=' atom | atom)*` up to the next pipe, `+`, `)` or the end.
    fn args(&mut self, keep_groups: bool) -> Result<Args, ParseError> {
        let mut args = Args::default();
        loop {
            match self.current() {
                None
                | Some(
                    Token::PipeGt | Token::Pipe | Token::PipePipe | Token::Plus | Token::RParen,
                ) => break,
                Some(Token::Name(name)) if matches!(self.peek(1), Some(Token::Eq)) => {
                    self.advance();
                    self.advance();
                    if name == INPUT_ARG {
                        if args.input.is_some() {
                            return Err(self.error("`v=` given twice"));
                        }
                        args.input = Some(self.expression_atom()?);
                    } else {
                        // a named operand is always a value or an operator,
                        // never a `!chain` stage
                        self.operand_arg(&mut args, false)?;
                        args.operand_name = Some(name.clone());
                    }
                }
                Some(_) => self.operand_arg(&mut args, keep_groups)?,
            }
        }
        Ok(args)
    }

    fn operand_arg(&mut self, args: &mut Args, keep_groups: bool) -> Result<(), ParseError> {
        let operand = if self.at_stage_group() {
            let stages = self.stage_group()?;
            if keep_groups {
                args.stage_groups.push(stages);
                return Ok(());
            }
            OperandExpr::Operator(stages)
        } else {
            OperandExpr::Value(Box::new(self.expression_atom()?))
        };
        if args.operand.is_some() {
            return Err(self.error("operators take at most one operand"));
        }
        args.operand = Some(operand);
        Ok(())
    }

    /// An argument value: a primary, without trailing pipes or `+`.
    fn expression_atom(&mut self) -> Result<Expr, ParseError> {
        self.primary()
    }
}

/// Append a segment, turning a bare expression into a pipeline.
fn push_segment(expr: &mut Expr, mode: SegmentMode, stage: Stage) {
    let segment = Segment { mode, stage };
    if let Expr::Pipeline(pipeline) = expr {
        pipeline.segments.push(segment);
        return;
    }
    let input = std::mem::replace(expr, Expr::Literal(Value::str("")));
    *expr = Expr::Pipeline(Pipeline {
        input: Some(Box::new(input)),
        segments: vec![segment],
    });
}

/// One `!chain` argument group becomes one stage.
fn group_stage(mut group: Vec<Stage>) -> Stage {
    if group.len() == 1 {
        if let Some(stage) = group.pop() {
            return stage;
        }
    }
    Stage {
        op: OpExpr::Chain(group),
        operand: None,
        operand_name: None,
        parallel: false,
    }
}
