//! Layout-aware rendering of compiled templates
//!
//! [`HtmlRenderer`] owns a compiled [`crate::TemplateSet`] and the
//! [`RenderOptions`] it was built from. Each render call carries its own
//! execution frame, so one renderer can serve many threads at once.

pub mod config;
mod error;
mod exec;
mod html;

pub use config::{ConfigError, RenderOptions};
pub use error::{ExecError, RenderError};
pub use html::{HtmlRenderer, Renderer};

use std::io::Write;

use crate::template::TemplateSet;
use crate::value::Value;

/// Execute `name` from `set` with no layout
pub(crate) fn execute(set: &TemplateSet, out: &mut dyn Write, name: &str, data: &Value) -> Result<(), RenderError> {
    exec::Exec::plain(set).execute(out, name, data)
}
