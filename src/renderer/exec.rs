//! Execution of compiled templates
//!
//! An [`Exec`] walks a unit's nodes against a data value and writes the
//! result into a sink. The layout helpers read the render target from an
//! explicit [`Frame`] owned by the render call, so the shared
//! [`TemplateSet`] is never written to while rendering.

use std::io::Write;

use tracing::trace;

use crate::parser::ast::{Body, Command, Node, Operand, Pipeline, Span, Spanned};
use crate::renderer::error::{ExecError, RenderError};
use crate::template::func::{AND, BLOCK, CURRENT, OR, YIELD};
use crate::template::TemplateSet;
use crate::value::Value;

/// What a layout render is wrapping
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame<'a> {
    /// Template executed by `yield` and reported by `current`
    pub target: &'a str,
    /// Data the target and blocks are executed against
    pub data: &'a Value,
}

pub(crate) struct Exec<'a> {
    set: &'a TemplateSet,
    frame: Option<Frame<'a>>,
}

impl<'a> Exec<'a> {
    /// Executor whose helpers have their no-layout behaviour
    pub fn plain(set: &'a TemplateSet) -> Self {
        Self { set, frame: None }
    }

    /// Executor whose helpers render `frame`
    pub fn layout(set: &'a TemplateSet, frame: Frame<'a>) -> Self {
        Self {
            set,
            frame: Some(frame),
        }
    }

    /// Execute the unit `name` with `dot` as the data value
    pub fn execute(&self, out: &mut dyn Write, name: &str, dot: &Value) -> Result<(), RenderError> {
        let unit = self.set.lookup(name).ok_or_else(|| RenderError::MissingTemplate {
            name: name.to_string(),
        })?;
        trace!(template = %unit.name, "executing template");

        let mut state = State {
            exec: self,
            template: &unit.name,
            vars: vec![("$".to_string(), dot.clone())],
        };
        state.walk(out, &unit.nodes, dot)
    }

    /// Execute `name` into a buffer and return the output as markup
    fn capture(&self, name: &str, dot: &Value) -> Result<Value, RenderError> {
        let mut buf = Vec::new();
        self.execute(&mut buf, name, dot)?;
        Ok(Value::html(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Per-unit execution state
struct State<'e, 'a> {
    exec: &'e Exec<'a>,
    template: &'e str,
    /// Variable stack; scopes end by truncating back to a mark
    vars: Vec<(String, Value)>,
}

impl State<'_, '_> {
    fn fail(&self, span: &Span, cause: ExecError) -> RenderError {
        RenderError::Execution {
            template: self.template.to_string(),
            span: span.clone(),
            cause,
        }
    }

    fn walk(&mut self, out: &mut dyn Write, body: &Body, dot: &Value) -> Result<(), RenderError> {
        for node in body {
            self.walk_node(out, node, dot)?;
        }
        Ok(())
    }

    fn walk_scoped(&mut self, out: &mut dyn Write, body: &Body, dot: &Value) -> Result<(), RenderError> {
        let mark = self.vars.len();
        let result = self.walk(out, body, dot);
        self.vars.truncate(mark);
        result
    }

    fn walk_node(&mut self, out: &mut dyn Write, node: &Spanned<Node>, dot: &Value) -> Result<(), RenderError> {
        match &node.node {
            Node::Text(text) => out.write_all(text.as_bytes())?,
            Node::Action(pipeline) => {
                let value = self.eval_pipeline(pipeline, dot)?;
                if pipeline.decl.is_empty() {
                    out.write_all(value.to_html().as_bytes())?;
                }
            }
            Node::If { branches, otherwise } => {
                let mark = self.vars.len();
                let mut taken = false;
                for (cond, body) in branches {
                    if self.eval_pipeline(cond, dot)?.is_true() {
                        self.walk_scoped(out, body, dot)?;
                        taken = true;
                        break;
                    }
                }
                if !taken {
                    if let Some(otherwise) = otherwise {
                        self.walk_scoped(out, otherwise, dot)?;
                    }
                }
                self.vars.truncate(mark);
            }
            Node::With {
                pipeline,
                body,
                otherwise,
            } => {
                let mark = self.vars.len();
                let value = self.eval_pipeline(pipeline, dot)?;
                if value.is_true() {
                    self.walk_scoped(out, body, &value)?;
                } else if let Some(otherwise) = otherwise {
                    self.walk_scoped(out, otherwise, dot)?;
                }
                self.vars.truncate(mark);
            }
            Node::Range {
                pipeline,
                body,
                otherwise,
            } => self.walk_range(out, node, pipeline, body, otherwise.as_ref(), dot)?,
            Node::Include { name, pipeline } => {
                let data = match pipeline {
                    Some(pipeline) => self.eval_pipeline(pipeline, dot)?,
                    None => Value::nil(),
                };
                if !self.exec.set.contains(name) {
                    return Err(self.fail(&node.span, ExecError::NoSuchTemplate { name: name.clone() }));
                }
                self.exec.execute(out, name, &data)?;
            }
        }
        Ok(())
    }

    fn walk_range(
        &mut self,
        out: &mut dyn Write,
        node: &Spanned<Node>,
        pipeline: &Pipeline,
        body: &Body,
        otherwise: Option<&Body>,
        dot: &Value,
    ) -> Result<(), RenderError> {
        let value = self.eval_commands(pipeline, dot)?;
        let items: Vec<(Value, Value)> = match &value {
            Value::Data(serde_json::Value::Null) => Vec::new(),
            Value::Data(serde_json::Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (Value::from(i), Value::Data(item.clone())))
                .collect(),
            Value::Data(serde_json::Value::Object(map)) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                entries
                    .into_iter()
                    .map(|(key, item)| (Value::from(key.as_str()), Value::Data(item.clone())))
                    .collect()
            }
            other => {
                return Err(self.fail(&node.span, ExecError::CannotRange { kind: other.kind() }));
            }
        };

        if items.is_empty() {
            if let Some(otherwise) = otherwise {
                self.walk_scoped(out, otherwise, dot)?;
            }
            return Ok(());
        }

        for (key, item) in items {
            let mark = self.vars.len();
            match pipeline.decl.as_slice() {
                [] => {}
                [elem] => self.vars.push((elem.node.clone(), item.clone())),
                [index, elem, ..] => {
                    self.vars.push((index.node.clone(), key));
                    self.vars.push((elem.node.clone(), item.clone()));
                }
            }
            let result = self.walk(out, body, &item);
            self.vars.truncate(mark);
            result?;
        }
        Ok(())
    }

    /// Evaluate a pipeline and bind its declared variable, if any
    fn eval_pipeline(&mut self, pipeline: &Pipeline, dot: &Value) -> Result<Value, RenderError> {
        let value = self.eval_commands(pipeline, dot)?;
        if let Some(var) = pipeline.decl.first() {
            self.vars.push((var.node.clone(), value.clone()));
        }
        Ok(value)
    }

    /// Evaluate a pipeline's commands, feeding each result into the next
    fn eval_commands(&mut self, pipeline: &Pipeline, dot: &Value) -> Result<Value, RenderError> {
        let mut piped = None;
        for command in &pipeline.commands {
            piped = Some(self.eval_command(command, dot, piped)?);
        }
        Ok(piped.unwrap_or_default())
    }

    fn eval_command(
        &mut self,
        command: &Spanned<Command>,
        dot: &Value,
        piped: Option<Value>,
    ) -> Result<Value, RenderError> {
        let Some(head) = command.node.args.first() else {
            return Ok(piped.unwrap_or_default());
        };

        if let Operand::Function(name) = &head.node {
            if matches!(name.as_str(), AND | OR) && self.exec.set.is_builtin(name) {
                return self.eval_logic(name == AND, command, dot, piped);
            }
            let mut args = Vec::with_capacity(command.node.args.len());
            for arg in &command.node.args[1..] {
                args.push(self.eval_operand(arg, dot)?);
            }
            args.extend(piped);
            return self.call(name, args, &command.span);
        }

        if command.node.args.len() > 1 || piped.is_some() {
            return Err(self.fail(
                &command.span,
                ExecError::NotAFunction {
                    operand: head.node.to_string(),
                },
            ));
        }
        self.eval_operand(head, dot)
    }

    /// `and` returns the first empty argument, `or` the first non-empty one,
    /// without evaluating the rest; otherwise the last argument. A piped
    /// value is the last argument.
    fn eval_logic(
        &mut self,
        is_and: bool,
        command: &Spanned<Command>,
        dot: &Value,
        piped: Option<Value>,
    ) -> Result<Value, RenderError> {
        let name = if is_and { AND } else { OR };
        let args = &command.node.args[1..];
        if args.is_empty() && piped.is_none() {
            return Err(self.fail(&command.span, ExecError::arity(name, "at least 1", 0)));
        }
        let mut last = Value::nil();
        for arg in args {
            last = self.eval_operand(arg, dot)?;
            if last.is_true() != is_and {
                return Ok(last);
            }
        }
        Ok(piped.unwrap_or(last))
    }

    fn eval_operand(&mut self, operand: &Spanned<Operand>, dot: &Value) -> Result<Value, RenderError> {
        match &operand.node {
            Operand::Dot => Ok(dot.clone()),
            Operand::Field(path) => dot.lookup(path).map_err(|e| self.fail(&operand.span, e)),
            Operand::Variable { name, fields } => {
                let value = self
                    .vars
                    .iter()
                    .rev()
                    .find(|(var, _)| var == name)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| {
                        self.fail(
                            &operand.span,
                            ExecError::UndefinedVariable { name: name.clone() },
                        )
                    })?;
                value.lookup(fields).map_err(|e| self.fail(&operand.span, e))
            }
            Operand::Function(name) => self.call(name, Vec::new(), &operand.span),
            Operand::Literal(value) => Ok(Value::Data(value.clone())),
            Operand::Pipeline(pipeline) => self.eval_pipeline(pipeline, dot),
        }
    }

    /// Call a helper or table function
    fn call(&mut self, name: &str, args: Vec<Value>, span: &Span) -> Result<Value, RenderError> {
        let frame = self.exec.frame;
        match name {
            YIELD => {
                if !args.is_empty() {
                    return Err(self.fail(span, ExecError::arity(YIELD, "0", args.len())));
                }
                let frame = frame.ok_or_else(|| self.fail(span, ExecError::NoLayout { helper: YIELD }))?;
                self.exec
                    .capture(frame.target, frame.data)
                    .map_err(|e| self.nested(span, YIELD, e))
            }
            CURRENT => {
                if !args.is_empty() {
                    return Err(self.fail(span, ExecError::arity(CURRENT, "0", args.len())));
                }
                Ok(Value::from(frame.map(|f| f.target).unwrap_or("")))
            }
            BLOCK => {
                let frame = frame.ok_or_else(|| self.fail(span, ExecError::NoLayout { helper: BLOCK }))?;
                if args.is_empty() || args.len() > 2 {
                    return Err(self.fail(span, ExecError::arity(BLOCK, "1 or 2", args.len())));
                }
                let Some(block) = args[0].as_str() else {
                    return Err(self.fail(
                        span,
                        ExecError::argument(BLOCK, format!("block name must be a string, got {}", args[0].kind())),
                    ));
                };
                if !self.exec.set.contains(block) {
                    return Ok(Value::html(""));
                }
                self.exec
                    .capture(block, frame.data)
                    .map_err(|e| self.nested(span, BLOCK, e))
            }
            _ => {
                let func = self.exec.set.funcs().get(name).ok_or_else(|| {
                    self.fail(span, ExecError::UndefinedFunction { name: name.to_string() })
                })?;
                func(&args).map_err(|e| {
                    self.fail(
                        span,
                        ExecError::Call {
                            name: name.to_string(),
                            message: e.to_string(),
                        },
                    )
                })
            }
        }
    }

    fn nested(&self, span: &Span, helper: &'static str, source: RenderError) -> RenderError {
        self.fail(
            span,
            ExecError::Nested {
                helper,
                source: Box::new(source),
            },
        )
    }
}
