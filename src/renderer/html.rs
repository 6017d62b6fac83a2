//! Layout-aware HTML renderer

use std::io::Write;

use tracing::{debug, trace};

use crate::error::CompileError;
use crate::renderer::config::RenderOptions;
use crate::renderer::error::RenderError;
use crate::renderer::exec::{Exec, Frame};
use crate::template::{markup_funcs, TemplateSet};
use crate::value::Value;

/// Anything that can render a named template with data into a sink
///
/// This is the boundary a serving layer hands its response writer to.
pub trait Renderer: Send + Sync {
    fn render(&self, out: &mut dyn Write, name: &str, data: &Value) -> Result<(), RenderError>;
}

/// Renders templates from a compiled directory, wrapping each render in the
/// configured layout
///
/// With a layout configured, rendering `name` executes the layout instead;
/// inside it `{{yield}}` renders `name`, `{{current}}` returns `name` and
/// `{{block "x"}}` renders `x` when it exists. Output written before a failure
/// is left in the sink.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    options: RenderOptions,
    templates: TemplateSet,
}

impl HtmlRenderer {
    /// Compile `options.directory` into a renderer
    ///
    /// The `html` and `js` markup functions are installed ahead of the
    /// caller's bundles, which may override them.
    pub fn new(mut options: RenderOptions) -> Result<Self, CompileError> {
        options.funcs.insert(0, markup_funcs());
        let templates = TemplateSet::compile(&options)?;
        Ok(Self { options, templates })
    }

    /// Render `name` with `data` into `out`
    pub fn render(&self, out: &mut dyn Write, name: &str, data: &Value) -> Result<(), RenderError> {
        if !self.options.has_layout() {
            trace!(template = name, "rendering without layout");
            return Exec::plain(&self.templates).execute(out, name, data);
        }

        let layout = self.options.layout.as_str();
        if !self.templates.contains(layout) {
            return Err(RenderError::MissingLayout {
                name: layout.to_string(),
            });
        }
        trace!(template = name, layout, "rendering through layout");
        let frame = Frame { target: name, data };
        Exec::layout(&self.templates, frame).execute(out, layout, data)
    }

    /// Render `name` with `data` into a new string
    pub fn render_to_string(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        let mut out = Vec::new();
        self.render(&mut out, name, data)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Recompile the template directory with the same options
    ///
    /// The current templates are replaced only if compilation succeeds.
    pub fn reload(&mut self) -> Result<(), CompileError> {
        let templates = TemplateSet::compile(&self.options)?;
        debug!(templates = templates.len(), "reloaded templates");
        self.templates = templates;
        Ok(())
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, out: &mut dyn Write, name: &str, data: &Value) -> Result<(), RenderError> {
        HtmlRenderer::render(self, out, name, data)
    }
}
