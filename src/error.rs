//! Error types for parsing and compiling templates

use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::ast::Span;
use crate::parser::lexer::Lexeme;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    #[error("function \"{name}\" not defined")]
    UndefinedFunction { name: String, span: Span },

    #[error("too many declarations in command")]
    TooManyDeclarations { span: Span },

    #[error("undefined variable \"{name}\"")]
    UndefinedVariable { name: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. }
            | ParseError::UndefinedFunction { span, .. }
            | ParseError::UndefinedVariable { span, .. }
            | ParseError::TooManyDeclarations { span } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        let span = self.span().clone();
        let (message, note) = match self {
            ParseError::Syntax {
                message, expected, ..
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };
                (message.clone(), format!("{}{}", message, expected_str))
            }
            other => (other.to_string(), other.to_string()),
        };

        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span))
                    .with_message(note)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => format!("{}: {}", filename, message),
        }
    }
}

impl<'a> From<chumsky::error::Rich<'a, Lexeme>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, Lexeme>) -> Self {
        use chumsky::error::{RichPattern, RichReason};

        let message = match err.reason() {
            RichReason::Custom(msg) => msg.to_string(),
            _ => match err.found() {
                Some(Lexeme::Action(tok)) => {
                    format!("Unexpected {} in action", tok)
                }
                Some(Lexeme::Close) => "Unexpected end of action".to_string(),
                Some(other) => format!("Unexpected {}", other),
                None => "Unexpected end of input".to_string(),
            },
        };

        // Format expected tokens nicely
        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format_lexeme(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of input".to_string()),
                _ => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

fn format_lexeme(lexeme: &Lexeme) -> String {
    lexeme.to_string()
}

/// Errors that can occur while compiling a template directory
#[derive(Error, Debug)]
pub enum CompileError {
    /// The template directory could not be walked
    #[error("cannot walk template directory {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// A template file could not be read
    #[error("cannot read template file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A template failed to parse
    #[error("template {name}: {}", format_parse_errors(errors))]
    Parse {
        name: String,
        text: String,
        errors: Vec<ParseError>,
    },
}

impl CompileError {
    /// Render the error, with source-annotated reports for parse failures
    pub fn report(&self) -> String {
        match self {
            CompileError::Parse { name, text, errors } => errors
                .iter()
                .map(|e| e.format(text, name))
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
