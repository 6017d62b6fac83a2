//! Discovery of template files on disk

use std::path::{Component, Path};

use tracing::trace;
use walkdir::WalkDir;

use crate::error::CompileError;

/// Raw text of one template file, keyed by its name in the set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    pub name: String,
    pub text: String,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Collect every file under `dir` whose name ends with one of `extensions`
///
/// Files are visited in file-name order. Each name is the path relative to
/// `dir` with components joined by `/`.
pub fn collect_sources(dir: &Path, extensions: &[String]) -> Result<Vec<TemplateSource>, CompileError> {
    let mut sources = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| CompileError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(name) = template_name(dir, path) else {
            continue;
        };
        if !extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            trace!(file = %name, "skipping file without template extension");
            continue;
        }

        let text = std::fs::read_to_string(path).map_err(|source| CompileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        sources.push(TemplateSource { name, text });
    }

    Ok(sources)
}

fn template_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn html() -> Vec<String> {
        vec![".html".to_string()]
    }

    #[test]
    fn test_names_are_relative_with_slashes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/c.html"), "deep").unwrap();
        fs::write(dir.path().join("top.html"), "top").unwrap();

        let sources = collect_sources(dir.path(), &html()).unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a/b/c.html", "top.html"]);
        assert_eq!(sources[0].text, "deep");
    }

    #[test]
    fn test_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("mail.tmpl"), "").unwrap();

        let sources = collect_sources(dir.path(), &html()).unwrap();
        assert_eq!(sources.len(), 1);

        let both = vec![".html".to_string(), ".tmpl".to_string()];
        let sources = collect_sources(dir.path(), &both).unwrap();
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_multi_dot_names_match_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.en.html"), "hi").unwrap();

        let sources = collect_sources(dir.path(), &html()).unwrap();
        assert_eq!(sources[0].name, "index.en.html");
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_sources(&dir.path().join("nope"), &html()).unwrap_err();
        assert!(matches!(err, CompileError::Walk { .. }));
    }
}
