//! Abstract Syntax Tree types for the template notation

use std::fmt;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A parsed template body
pub type Body = Vec<Spanned<Node>>;

/// One element of a template body
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text between actions, emitted verbatim
    Text(String),
    /// Output action: `{{ pipeline }}`
    ///
    /// A pipeline with a declaration (`{{ $x := ... }}`) binds the variable
    /// and produces no output.
    Action(Pipeline),
    /// Conditional: `{{if p}} ... {{else if q}} ... {{else}} ... {{end}}`
    If {
        branches: Vec<(Pipeline, Body)>,
        otherwise: Option<Body>,
    },
    /// Loop: `{{range p}} ... {{else}} ... {{end}}`
    Range {
        pipeline: Pipeline,
        body: Body,
        otherwise: Option<Body>,
    },
    /// Rebinds dot when the value is non-empty: `{{with p}} ... {{end}}`
    With {
        pipeline: Pipeline,
        body: Body,
        otherwise: Option<Body>,
    },
    /// Inclusion of another unit: `{{template "name" p}}`
    Include {
        name: String,
        pipeline: Option<Pipeline>,
    },
}

/// Commands chained with `|`, optionally preceded by variable declarations
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Declared variable names, including the leading `$`
    pub decl: Vec<Spanned<String>>,
    pub commands: Vec<Spanned<Command>>,
}

/// A function call with arguments, or a single operand
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Spanned<Operand>>,
}

impl Command {
    /// Name of the function this command calls, if its head is a function
    pub fn function(&self) -> Option<&str> {
        match self.args.first().map(|a| &a.node) {
            Some(Operand::Function(name)) => Some(name),
            _ => None,
        }
    }
}

/// A single argument in a command
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// The current value, `.`
    Dot,
    /// A field chain on dot, `.User.Name`
    Field(Vec<String>),
    /// A variable with an optional field chain, `$user.Name`
    Variable { name: String, fields: Vec<String> },
    /// A function identifier
    Function(String),
    /// A string, number, boolean or nil constant
    Literal(serde_json::Value),
    /// A parenthesized pipeline
    Pipeline(Box<Pipeline>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Dot => write!(f, "."),
            Operand::Field(path) => write!(f, ".{}", path.join(".")),
            Operand::Variable { name, fields } => {
                write!(f, "{}", name)?;
                for field in fields {
                    write!(f, ".{}", field)?;
                }
                Ok(())
            }
            Operand::Function(name) => write!(f, "{}", name),
            Operand::Literal(value) => write!(f, "{}", value),
            Operand::Pipeline(_) => write!(f, "(pipeline)"),
        }
    }
}
