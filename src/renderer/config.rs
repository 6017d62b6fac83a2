//! Configuration for template compilation and rendering

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::parser::Delims;
use crate::template::FuncMap;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

pub const DEFAULT_DIRECTORY: &str = "templates";
pub const DEFAULT_EXTENSION: &str = ".html";

/// Options fixed when a renderer is built
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Directory to load templates from
    pub directory: PathBuf,

    /// Layout template name; empty renders templates without a layout
    pub layout: String,

    /// File name suffixes that mark template files
    pub extensions: Vec<String>,

    /// Function bundles, applied in order over the built-ins
    pub funcs: Vec<FuncMap>,

    /// Action delimiters
    pub delims: Delims,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            layout: String::new(),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            funcs: Vec::new(),
            delims: Delims::default(),
        }
    }
}

/// TOML structure for deserializing options
#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlOptions {
    directory: Option<PathBuf>,
    layout: Option<String>,
    extensions: Option<Vec<String>>,
    delims: Delims,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a TOML file
    ///
    /// A relative `directory` is resolved against the file's parent directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut options = Self::from_str(&content)?;
        if options.directory.is_relative() {
            if let Some(parent) = path.parent() {
                options.directory = parent.join(&options.directory);
            }
        }
        Ok(options)
    }

    /// Load options from a TOML string; absent keys keep their defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlOptions = toml::from_str(content)?;
        let mut options = Self::default();
        if let Some(directory) = parsed.directory.filter(|d| !d.as_os_str().is_empty()) {
            options.directory = directory;
        }
        if let Some(layout) = parsed.layout {
            options.layout = layout;
        }
        if let Some(extensions) = parsed.extensions.filter(|e| !e.is_empty()) {
            options.extensions = extensions;
        }
        options.delims = parsed.delims;
        Ok(options)
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Replace the extension list
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Append a function bundle; it overrides bundles added before it
    pub fn with_funcs(mut self, funcs: FuncMap) -> Self {
        self.funcs.push(funcs);
        self
    }

    pub fn with_delims(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.delims = Delims::new(left, right);
        self
    }

    /// Whether a layout wraps every render
    pub fn has_layout(&self) -> bool {
        !self.layout.is_empty()
    }
}
