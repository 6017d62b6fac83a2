//! Lexer for the template notation
//!
//! Lexing happens in two layers. [`tokenize`] splits the source into literal
//! text and actions using the configured [`Delims`] (which are only known at
//! runtime), handling comments and `{{-`/`-}}` trim markers. The inside of
//! each action is then tokenized with the logos-generated [`Token`] lexer.

use std::fmt;

use logos::Logos;
use serde::Deserialize;

use crate::error::ParseError;
use crate::parser::ast::Span;

/// Default left action delimiter
pub const DEFAULT_LEFT_DELIM: &str = "{{";
/// Default right action delimiter
pub const DEFAULT_RIGHT_DELIM: &str = "}}";

/// Left and right action delimiters
///
/// An empty delimiter falls back to the default (`{{` or `}}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Delims {
    /// Left delimiter, defaults to `{{`
    pub left: String,
    /// Right delimiter, defaults to `}}`
    pub right: String,
}

impl Delims {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// The effective left delimiter
    pub fn left(&self) -> &str {
        if self.left.is_empty() {
            DEFAULT_LEFT_DELIM
        } else {
            &self.left
        }
    }

    /// The effective right delimiter
    pub fn right(&self) -> &str {
        if self.right.is_empty() {
            DEFAULT_RIGHT_DELIM
        } else {
            &self.right
        }
    }
}

/// Tokens inside an action
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Control keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("range")]
    Range,
    #[token("with")]
    With,
    #[token("template")]
    Template,

    // Constants
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,

    // Punctuation
    #[token("|")]
    Pipe,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":=")]
    Declare,
    #[token(".")]
    Dot,

    /// Field chain on dot, `.User.Name`
    #[regex(r"(\.[A-Za-z_][A-Za-z0-9_]*)+", |lex| {
        lex.slice()[1..].split('.').map(str::to_string).collect::<Vec<_>>()
    })]
    Field(Vec<String>),

    /// Variable reference with its field chain, kept verbatim (`$`, `$x`, `$x.Name`)
    #[regex(r"\$[A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*", |lex| lex.slice().to_string())]
    Variable(String),

    // Literals - identifiers must come after keywords
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, unquote)]
    String(String),

    #[regex(r"`[^`]*`", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    RawString(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
}

/// Resolve the escapes of a double-quoted string literal
fn unquote(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::If => write!(f, "keyword 'if'"),
            Token::Else => write!(f, "keyword 'else'"),
            Token::End => write!(f, "keyword 'end'"),
            Token::Range => write!(f, "keyword 'range'"),
            Token::With => write!(f, "keyword 'with'"),
            Token::Template => write!(f, "keyword 'template'"),
            Token::True => write!(f, "'true'"),
            Token::False => write!(f, "'false'"),
            Token::Nil => write!(f, "'nil'"),
            Token::Pipe => write!(f, "'|'"),
            Token::ParenOpen => write!(f, "'('"),
            Token::ParenClose => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
            Token::Declare => write!(f, "':='"),
            Token::Dot => write!(f, "'.'"),
            Token::Field(path) => write!(f, "field '.{}'", path.join(".")),
            Token::Variable(v) => write!(f, "variable '{}'", v),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::String(s) | Token::RawString(s) => write!(f, "string {:?}", s),
            Token::Int(n) => write!(f, "number {}", n),
            Token::Float(n) => write!(f, "number {}", n),
        }
    }
}

/// Input to the grammar: literal text, action boundaries and action tokens
#[derive(Debug, Clone, PartialEq)]
pub enum Lexeme {
    Text(String),
    Open,
    Close,
    Action(Token),
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::Text(_) => write!(f, "text"),
            Lexeme::Open => write!(f, "start of action"),
            Lexeme::Close => write!(f, "end of action"),
            Lexeme::Action(tok) => write!(f, "{}", tok),
        }
    }
}

/// Split a template source into lexemes with spans
pub fn tokenize(source: &str, delims: &Delims) -> Result<Vec<(Lexeme, Span)>, Vec<ParseError>> {
    let left = delims.left();
    let right = delims.right();
    let mut lexemes = Vec::new();
    let mut errors = Vec::new();
    let mut pos = 0;
    let mut trim_next = false;

    while pos < source.len() {
        let Some(offset) = source[pos..].find(left) else {
            push_text(&mut lexemes, &source[pos..], trim_next, false, pos..source.len());
            break;
        };
        let start = pos + offset;
        let mut inner_start = start + left.len();
        let trim_prev = has_left_trim(&source[inner_start..]);
        if trim_prev {
            inner_start += 1;
        }
        push_text(&mut lexemes, &source[pos..start], trim_next, trim_prev, pos..start);

        if is_comment(&source[inner_start..]) {
            match close_comment(source, inner_start, right) {
                Some((end, trim)) => {
                    trim_next = trim;
                    pos = end;
                }
                None => {
                    errors.push(syntax_error(start..source.len(), "unclosed comment"));
                    break;
                }
            }
            continue;
        }

        let Some(close) = find_close(source, inner_start, right) else {
            errors.push(syntax_error(start..source.len(), "unclosed action"));
            break;
        };

        let mut inner_end = close;
        trim_next = has_right_trim(&source[inner_start..inner_end]);
        if trim_next {
            inner_end -= 1;
        }

        lexemes.push((Lexeme::Open, start..inner_start));
        for (tok, span) in Token::lexer(&source[inner_start..inner_end]).spanned() {
            let span = inner_start + span.start..inner_start + span.end;
            match tok {
                Ok(tok) => lexemes.push((Lexeme::Action(tok), span)),
                Err(()) => errors.push(syntax_error(
                    span.clone(),
                    format!("unexpected {:?} in action", &source[span]),
                )),
            }
        }
        lexemes.push((Lexeme::Close, close..close + right.len()));
        pos = close + right.len();
    }

    if errors.is_empty() {
        Ok(lexemes)
    } else {
        Err(errors)
    }
}

fn push_text(lexemes: &mut Vec<(Lexeme, Span)>, text: &str, trim_start: bool, trim_end: bool, span: Span) {
    let mut text = text;
    if trim_start {
        text = text.trim_start_matches(is_trim_space);
    }
    if trim_end {
        text = text.trim_end_matches(is_trim_space);
    }
    if !text.is_empty() {
        lexemes.push((Lexeme::Text(text.to_string()), span));
    }
}

/// Whitespace removed by trim markers
fn is_trim_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn syntax_error(span: Span, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        span,
        message: message.into(),
        expected: vec![],
    }
}

/// `{{- ` trims the text before the action
fn has_left_trim(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_whitespace())
}

/// ` -}}` trims the text after the action
fn has_right_trim(inner: &str) -> bool {
    let mut chars = inner.chars().rev();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_whitespace())
}

fn is_comment(rest: &str) -> bool {
    rest.trim_start().starts_with("/*")
}

/// Find the end of a comment action; returns the offset after the right
/// delimiter and whether it carries a trim marker
fn close_comment(source: &str, from: usize, right: &str) -> Option<(usize, bool)> {
    let end = from + source[from..].find("*/")? + 2;
    let rest = &source[end..];
    if rest.starts_with(right) {
        return Some((end + right.len(), false));
    }
    let trimmed = rest.trim_start();
    let marker = trimmed.strip_prefix('-')?;
    if trimmed.len() < rest.len() && marker.starts_with(right) {
        let close = source.len() - marker.len();
        return Some((close + right.len(), true));
    }
    None
}

/// Find the right delimiter of an action, skipping over quoted literals
fn find_close(source: &str, from: usize, right: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'`' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'`' {
                    i += 1;
                }
                i += 1;
            }
            _ if bytes[i..].starts_with(right.as_bytes()) => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Lex the tokens of a single action body
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
