//! Error types for template execution

use thiserror::Error;

use crate::parser::ast::Span;

/// Errors returned by a render call
#[derive(Debug, Error)]
pub enum RenderError {
    /// The configured layout is not in the template set; nothing was written
    #[error("layout template \"{name}\" is not defined")]
    MissingLayout { name: String },

    /// The requested template is not in the template set
    #[error("template \"{name}\" is not defined")]
    MissingTemplate { name: String },

    /// Executing a template failed; output written before the failure stays
    #[error("template: {template}: {cause}")]
    Execution {
        template: String,
        span: Span,
        cause: ExecError,
    },

    /// Writing to the output sink failed
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Name of the template where execution failed, following nested
    /// `yield`/`block` failures to the innermost one
    pub fn template(&self) -> Option<&str> {
        match self {
            RenderError::Execution {
                cause: ExecError::Nested { source, .. },
                ..
            } => source.template(),
            RenderError::Execution { template, .. } => Some(template),
            RenderError::MissingTemplate { name } | RenderError::MissingLayout { name } => Some(name),
            RenderError::Io(_) => None,
        }
    }
}

/// Causes of an execution failure inside a template
#[derive(Debug, Error)]
pub enum ExecError {
    /// `yield` or `block` used while no layout is configured
    #[error("{helper} called with no layout defined")]
    NoLayout { helper: &'static str },

    /// A template executed by `yield` or `block` failed
    #[error("error calling {helper}: {source}")]
    Nested {
        helper: &'static str,
        source: Box<RenderError>,
    },

    #[error("nil pointer evaluating field {field}")]
    NilField { field: String },

    #[error("can't evaluate field {field} in type {kind}")]
    NoField { field: String, kind: &'static str },

    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("function \"{name}\" not defined")]
    UndefinedFunction { name: String },

    #[error("can't give argument to non-function {operand}")]
    NotAFunction { operand: String },

    #[error("range can't iterate over {kind}")]
    CannotRange { kind: &'static str },

    #[error("no such template \"{name}\"")]
    NoSuchTemplate { name: String },

    #[error("wrong number of args for {name}: want {want} got {got}")]
    Arity {
        name: String,
        want: String,
        got: usize,
    },

    #[error("invalid argument for {name}: {message}")]
    Argument { name: String, message: String },

    /// A caller-supplied or built-in function reported failure
    #[error("error calling {name}: {message}")]
    Call { name: String, message: String },
}

impl ExecError {
    pub fn arity(name: &str, want: impl Into<String>, got: usize) -> Self {
        Self::Arity {
            name: name.to_string(),
            want: want.into(),
            got,
        }
    }

    pub fn argument(name: &str, message: impl Into<String>) -> Self {
        Self::Argument {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
