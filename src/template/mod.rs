//! Template sets compiled from a directory
//!
//! Compilation runs in two stages: [`collect_sources`] walks the template
//! directory and reads every matching file, then [`TemplateSet::from_sources`]
//! parses each source into a named [`Unit`] against one shared function table.
//!
//! # Example
//!
//! ```text
//! templates/
//!   layout.html        -> "layout.html"
//!   users/show.html    -> "users/show.html"
//! ```

pub mod func;
mod set;
mod source;

pub use func::{builtins, markup_funcs, Func, FuncError, FuncMap};
pub use set::{TemplateSet, Unit};
pub use source::{collect_sources, TemplateSource};
