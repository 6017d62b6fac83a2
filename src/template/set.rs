//! Compiled, immutable set of template units

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::CompileError;
use crate::parser::{self, Body, Delims, Node, Spanned};
use crate::renderer::RenderOptions;
use crate::template::func::{builtins, FuncMap, HELPER_NAMES};
use crate::template::source::{collect_sources, TemplateSource};

/// Body given to the placeholder unit named after the template directory
const ROOT_BODY: &str = "root";

/// One parsed template
#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    /// Source text, kept for diagnostics
    pub text: String,
    pub nodes: Body,
}

/// All compiled units of a directory sharing one function table
///
/// Nothing in a set changes after compilation; rendering only reads it.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    root: String,
    units: BTreeMap<String, Unit>,
    funcs: FuncMap,
    /// Names defined by caller bundles, built-ins they replace included
    custom: BTreeSet<String>,
}

impl TemplateSet {
    /// Walk `options.directory` and compile every matching file
    pub fn compile(options: &RenderOptions) -> Result<Self, CompileError> {
        debug!(
            directory = %options.directory.display(),
            extensions = ?options.extensions,
            "compiling templates"
        );
        let sources = collect_sources(&options.directory, &options.extensions)?;
        Self::from_sources(
            &root_name(&options.directory),
            sources,
            &options.delims,
            &options.funcs,
        )
    }

    /// Compile already-loaded sources
    ///
    /// The function table is the built-ins overlaid by each bundle in order.
    /// The first source that fails to parse aborts the whole set.
    pub fn from_sources(
        root: &str,
        sources: impl IntoIterator<Item = TemplateSource>,
        delims: &Delims,
        bundles: &[FuncMap],
    ) -> Result<Self, CompileError> {
        let mut funcs = builtins();
        for bundle in bundles {
            funcs.extend(bundle);
        }
        let custom: BTreeSet<String> = bundles.iter().flat_map(|b| b.names()).map(str::to_string).collect();

        let mut units = BTreeMap::new();
        units.insert(
            root.to_string(),
            Unit {
                name: root.to_string(),
                text: ROOT_BODY.to_string(),
                nodes: vec![Spanned::new(Node::Text(ROOT_BODY.to_string()), 0..ROOT_BODY.len())],
            },
        );

        let is_known = |name: &str| HELPER_NAMES.contains(&name) || funcs.contains(name);
        for source in sources {
            let nodes = parse_unit(&source, delims, &is_known)?;
            trace!(template = %source.name, nodes = nodes.len(), "parsed template");
            units.insert(
                source.name.clone(),
                Unit {
                    name: source.name,
                    text: source.text,
                    nodes,
                },
            );
        }

        debug!(root, templates = units.len(), "compiled template set");
        Ok(Self {
            root: root.to_string(),
            units,
            funcs,
            custom,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&Unit> {
        self.units.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Names of every unit, the placeholder root included, in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Always false: a set holds at least its root unit
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn root_name(&self) -> &str {
        &self.root
    }

    /// The merged function table
    pub fn funcs(&self) -> &FuncMap {
        &self.funcs
    }

    /// True when `name` resolves to a built-in no bundle replaced
    pub fn is_builtin(&self, name: &str) -> bool {
        self.funcs.contains(name) && !self.custom.contains(name)
    }
}

fn parse_unit(
    source: &TemplateSource,
    delims: &Delims,
    is_known: &dyn Fn(&str) -> bool,
) -> Result<Body, CompileError> {
    let fail = |errors| CompileError::Parse {
        name: source.name.clone(),
        text: source.text.clone(),
        errors,
    };
    let nodes = parser::parse(&source.text, delims).map_err(fail)?;
    let errors = parser::validate(&nodes, is_known);
    if !errors.is_empty() {
        return Err(fail(errors));
    }
    Ok(nodes)
}

fn root_name(dir: &Path) -> String {
    dir.to_string_lossy().replace('\\', "/")
}
