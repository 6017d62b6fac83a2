//! layout-render - HTML templates with nested layouts, named blocks and `yield`
//!
//! This library compiles a directory of templates into an immutable
//! [`TemplateSet`] and renders them through an optional layout with
//! [`HtmlRenderer`].
//!
//! # Example
//!
//! ```rust
//! use layout_render::{render_str, Value};
//!
//! let html = render_str("Hello {{.}}", &Value::from("World")).unwrap();
//! assert_eq!(html, "Hello World");
//! ```

pub mod error;
pub mod parser;
pub mod renderer;
pub mod template;
pub mod value;

pub use error::{CompileError, ParseError};
pub use parser::Delims;
pub use renderer::{ConfigError, ExecError, HtmlRenderer, RenderError, RenderOptions, Renderer};
pub use template::{FuncError, FuncMap, TemplateSet, TemplateSource};
pub use value::Value;

use thiserror::Error;

/// Errors from the one-shot [`render_str`] pipeline
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Name given to the template compiled by [`render_str`]
const INLINE_NAME: &str = "inline";

/// Render a single template source with default delimiters
///
/// The template has no layout, so `yield` and `block` fail and `current`
/// is empty; `html` and `js` are available.
///
/// # Example
///
/// ```rust
/// use layout_render::{render_str, Value};
/// use serde_json::json;
///
/// let data = Value::from(json!({"items": ["a", "b"]}));
/// let html = render_str("{{range .items}}<li>{{.}}</li>{{end}}", &data).unwrap();
/// assert_eq!(html, "<li>a</li><li>b</li>");
/// ```
pub fn render_str(source: &str, data: &Value) -> Result<String, Error> {
    let set = TemplateSet::from_sources(
        INLINE_NAME,
        [TemplateSource::new(INLINE_NAME, source)],
        &Delims::default(),
        &[template::markup_funcs()],
    )?;
    let mut out = Vec::new();
    renderer::execute(&set, &mut out, INLINE_NAME, data)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_str() {
        let data = Value::from(json!({"name": "<Ann>"}));
        assert_eq!(render_str("Hi {{.name}}", &data).unwrap(), "Hi &lt;Ann&gt;");
    }

    #[test]
    fn test_render_str_parse_error() {
        let err = render_str("{{if .x}}", &Value::nil()).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Parse { .. })));
    }

    #[test]
    fn test_render_str_exec_error() {
        let err = render_str("{{yield}}", &Value::nil()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "template: inline: yield called with no layout defined"
        );
    }
}
