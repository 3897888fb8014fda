//! Line lexer using logos.

use brier_ir::{ParseError, Span};
use logos::Logos;

/// A token of one script line.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")] // Skip horizontal whitespace
pub enum Token {
    // === Comment (rest of the line) ===
    #[regex(r"#[^\n]*")]
    Comment,

    // === Sigils ===
    #[token("&")]
    Amp,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,

    // === Pipes ===
    #[token("|>")]
    PipeGt,
    #[token("||")]
    PipePipe,
    #[token("|")]
    Pipe,

    // === Punctuation ===
    #[token("+")]
    Plus,
    #[token("=")]
    Eq,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    // === Literals ===

    // `$N` line reference
    #[regex(r"\$[0-9]+", |lex| lex.slice()[1..].parse::<usize>().ok())]
    LineRef(usize),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    // String literal (double-quoted, backslash escapes)
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    Str(String),

    // Operator or argument name
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),
}

impl Token {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Comment => "a comment".to_string(),
            Token::LineRef(n) => format!("`${n}`"),
            Token::Int(n) => format!("`{n}`"),
            Token::Float(x) => format!("`{x}`"),
            Token::Str(s) => format!("{s:?}"),
            Token::Name(name) => format!("`{name}`"),
            other => format!("`{}`", other.punct()),
        }
    }

    fn punct(&self) -> &'static str {
        match self {
            Token::Amp => "&",
            Token::Bang => "!",
            Token::Question => "?",
            Token::PipeGt => "|>",
            Token::PipePipe => "||",
            Token::Pipe => "|",
            Token::Plus => "+",
            Token::Eq => "=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Comment
            | Token::LineRef(_)
            | Token::Int(_)
            | Token::Float(_)
            | Token::Str(_)
            | Token::Name(_) => "",
        }
    }
}

/// Lex a whole line. A trailing comment is dropped.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let span = Span::from_range(lexer.span());
        match result {
            Ok(Token::Comment) => break,
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(ParseError::new(
                    span,
                    format!("unexpected `{}`", lexer.slice()),
                ))
            }
        }
    }
    Ok(tokens)
}

/// Process string escape sequences.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(c) => {
                    // Unknown escape - keep as-is
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source)
            .unwrap_or_default()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_lex_command() {
        assert_eq!(
            kinds(r#"!join sep=", " |> upper"#),
            vec![
                Token::Bang,
                Token::Name("join".into()),
                Token::Name("sep".into()),
                Token::Eq,
                Token::Str(", ".into()),
                Token::PipeGt,
                Token::Name("upper".into()),
            ]
        );
    }

    #[test]
    fn test_lex_pipes_longest_match() {
        assert_eq!(
            kinds("$1 || count | get |> len"),
            vec![
                Token::LineRef(1),
                Token::PipePipe,
                Token::Name("count".into()),
                Token::Pipe,
                Token::Name("get".into()),
                Token::PipeGt,
                Token::Name("len".into()),
            ]
        );
    }

    #[test]
    fn test_lex_numbers_and_escapes() {
        assert_eq!(
            kinds(r#"-3 2.5 "a\"b\n""#),
            vec![
                Token::Int(-3),
                Token::Float(2.5),
                Token::Str("a\"b\n".into()),
            ]
        );
    }

    #[test]
    fn test_trailing_comment_is_dropped() {
        assert_eq!(kinds("$2 # note"), vec![Token::LineRef(2)]);
    }

    #[test]
    fn test_unknown_character() {
        let err = lex("$1 ^ 2").unwrap_err();
        assert_eq!(err.span, Span::new(3, 4));
    }
}
