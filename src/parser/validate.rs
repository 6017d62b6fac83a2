//! Checks run on a parsed body before it joins a template set

use crate::error::ParseError;
use crate::parser::ast::{Body, Command, Node, Operand, Pipeline, Spanned};

/// Check a parsed body against the set of known function names
///
/// Reports every call to an unknown function, every variable used outside
/// the scope that declares it, and every `if`, `with` or output action that
/// declares more than one variable.
pub fn validate(body: &Body, is_known: &dyn Fn(&str) -> bool) -> Vec<ParseError> {
    let mut checker = Checker {
        is_known,
        vars: vec!["$".to_string()],
        errors: Vec::new(),
    };
    checker.check_body(body);
    checker.errors
}

/// Walk state; `vars` is the stack of names in scope, truncated when a
/// control structure ends
struct Checker<'f> {
    is_known: &'f dyn Fn(&str) -> bool,
    vars: Vec<String>,
    errors: Vec<ParseError>,
}

impl Checker<'_> {
    fn check_body(&mut self, body: &Body) {
        for node in body {
            self.check_node(&node.node);
        }
    }

    fn check_scoped(&mut self, body: &Body) {
        let mark = self.vars.len();
        self.check_body(body);
        self.vars.truncate(mark);
    }

    fn check_node(&mut self, node: &Node) {
        let mark = self.vars.len();
        match node {
            Node::Text(_) => {}
            // Declarations here last until the enclosing structure ends
            Node::Action(pipeline) => {
                self.check_single_decl(pipeline);
                self.check_pipeline(pipeline);
                return;
            }
            Node::If {
                branches,
                otherwise,
            } => {
                for (cond, branch) in branches {
                    self.check_single_decl(cond);
                    self.check_pipeline(cond);
                    self.check_scoped(branch);
                }
                if let Some(otherwise) = otherwise {
                    self.check_scoped(otherwise);
                }
            }
            Node::With {
                pipeline,
                body,
                otherwise,
            } => {
                self.check_single_decl(pipeline);
                self.check_pipeline(pipeline);
                self.check_scoped(body);
                if let Some(otherwise) = otherwise {
                    self.check_scoped(otherwise);
                }
            }
            Node::Range {
                pipeline,
                body,
                otherwise,
            } => {
                // Range variables are bound per iteration, never in `else`
                self.check_pipeline(pipeline);
                self.check_scoped(body);
                self.vars.truncate(mark);
                if let Some(otherwise) = otherwise {
                    self.check_scoped(otherwise);
                }
            }
            Node::Include { pipeline, .. } => {
                if let Some(pipeline) = pipeline {
                    self.check_single_decl(pipeline);
                    self.check_pipeline(pipeline);
                }
                return;
            }
        }
        self.vars.truncate(mark);
    }

    fn check_single_decl(&mut self, pipeline: &Pipeline) {
        if pipeline.decl.len() > 1 {
            let first = pipeline.decl[0].span.start;
            let last = pipeline.decl[pipeline.decl.len() - 1].span.end;
            self.errors.push(ParseError::TooManyDeclarations { span: first..last });
        }
    }

    /// Check the commands, then bring the declared names into scope
    fn check_pipeline(&mut self, pipeline: &Pipeline) {
        for command in &pipeline.commands {
            self.check_command(command);
        }
        self.vars.extend(pipeline.decl.iter().map(|d| d.node.clone()));
    }

    fn check_command(&mut self, command: &Spanned<Command>) {
        for arg in &command.node.args {
            match &arg.node {
                Operand::Function(name) if !(self.is_known)(name) => {
                    self.errors.push(ParseError::UndefinedFunction {
                        name: name.clone(),
                        span: arg.span.clone(),
                    });
                }
                Operand::Variable { name, .. } if !self.vars.iter().any(|v| v == name) => {
                    self.errors.push(ParseError::UndefinedVariable {
                        name: name.clone(),
                        span: arg.span.clone(),
                    });
                }
                Operand::Pipeline(inner) => {
                    self.check_single_decl(inner);
                    self.check_pipeline(inner);
                }
                _ => {}
            }
        }
    }
}
