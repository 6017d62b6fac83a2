//! Integration tests for compiling template directories and rendering
//! through layouts

use std::fs;
use std::path::Path;

use layout_render::{
    CompileError, ExecError, FuncError, FuncMap, HtmlRenderer, RenderError, RenderOptions, Renderer, TemplateSet, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

/// Build a template directory from (relative path, contents) pairs
fn template_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (name, text) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    dir
}

fn renderer(dir: &Path, layout: &str) -> HtmlRenderer {
    let options = RenderOptions::new().with_directory(dir).with_layout(layout);
    HtmlRenderer::new(options).expect("templates should compile")
}

#[test]
fn test_names_are_normalized_paths() {
    let dir = template_dir(&[("a/b/c.html", "deep"), ("index.html", "top"), ("notes.txt", "skip")]);
    let set = TemplateSet::compile(&RenderOptions::new().with_directory(dir.path())).unwrap();

    assert!(set.contains("a/b/c.html"));
    assert!(set.contains("index.html"));
    assert!(!set.contains("notes.txt"));
    assert!(set.contains(set.root_name()));
    assert_eq!(set.len(), 3);
}

#[test]
fn test_empty_directory_has_root_placeholder() {
    let dir = template_dir(&[]);
    let set = TemplateSet::compile(&RenderOptions::new().with_directory(dir.path())).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.lookup(set.root_name()).unwrap().text, "root");
}

#[test]
fn test_one_invalid_file_fails_compile() {
    let dir = template_dir(&[
        ("good.html", "fine {{.}}"),
        ("pages/bad.html", "{{range .Items}}no end"),
    ]);
    let err = HtmlRenderer::new(RenderOptions::new().with_directory(dir.path())).unwrap_err();
    match &err {
        CompileError::Parse { name, errors, .. } => {
            assert_eq!(name, "pages/bad.html");
            assert!(!errors.is_empty());
        }
        other => panic!("expected parse error, got {other}"),
    }
    assert!(err.report().contains("pages/bad.html"));
}

#[test]
fn test_unknown_function_fails_compile() {
    let dir = template_dir(&[("page.html", "{{shout .}}")]);
    let err = HtmlRenderer::new(RenderOptions::new().with_directory(dir.path())).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r#"template page.html: function "shout" not defined"#);
}

#[test]
fn test_out_of_scope_variable_fails_compile() {
    let dir = template_dir(&[("page.html", "{{with .user}}{{$name := .name}}{{end}}{{$name}}")]);
    let err = HtmlRenderer::new(RenderOptions::new().with_directory(dir.path())).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r#"template page.html: undefined variable "$name""#);
}

#[test]
fn test_missing_directory_fails_compile() {
    let dir = template_dir(&[]);
    let options = RenderOptions::new().with_directory(dir.path().join("missing"));
    assert!(matches!(HtmlRenderer::new(options), Err(CompileError::Walk { .. })));
}

#[test]
fn test_no_layout_passthrough() {
    let dir = template_dir(&[("index.html", "Hello {{.}}")]);
    let r = renderer(dir.path(), "");
    assert_eq!(r.render_to_string("index.html", &Value::from("World")).unwrap(), "Hello World");
}

#[test]
fn test_layout_yield_composition() {
    let dir = template_dir(&[
        ("layout.html", "<body>{{yield}}</body>"),
        ("index.html", "Hello {{.}}"),
    ]);
    let r = renderer(dir.path(), "layout.html");
    assert_eq!(
        r.render_to_string("index.html", &Value::from("World")).unwrap(),
        "<body>Hello World</body>"
    );
}

#[test]
fn test_missing_block_is_silent() {
    let dir = template_dir(&[
        ("layout.html", "[{{block \"sidebar.html\"}}]{{yield}}"),
        ("index.html", "x"),
    ]);
    let r = renderer(dir.path(), "layout.html");
    assert_eq!(r.render_to_string("index.html", &Value::nil()).unwrap(), "[]x");
}

#[test]
fn test_present_block_renders_with_data() {
    let dir = template_dir(&[
        ("layout.html", "{{block \"nav.html\" true}}|{{yield}}"),
        ("nav.html", "<nav>{{.user}}</nav>"),
        ("index.html", "body"),
    ]);
    let r = renderer(dir.path(), "layout.html");
    let data = Value::from(json!({"user": "ann"}));
    assert_eq!(r.render_to_string("index.html", &data).unwrap(), "<nav>ann</nav>|body");
}

#[test]
fn test_current_identity() {
    let dir = template_dir(&[
        ("layout/base.html", "{{current}}"),
        ("users/show.html", ""),
    ]);
    let r = renderer(dir.path(), "layout/base.html");
    assert_eq!(r.render_to_string("users/show.html", &Value::nil()).unwrap(), "users/show.html");
}

#[test]
fn test_current_without_layout_is_empty() {
    let dir = template_dir(&[("index.html", "[{{current}}]")]);
    let r = renderer(dir.path(), "");
    assert_eq!(r.render_to_string("index.html", &Value::nil()).unwrap(), "[]");
}

#[test]
fn test_yield_without_layout_fails() {
    let dir = template_dir(&[("index.html", "before {{yield}}")]);
    let r = renderer(dir.path(), "");
    let mut out = Vec::new();
    let err = r.render(&mut out, "index.html", &Value::nil()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"template: index.html: yield called with no layout defined");
    // Streaming: output before the failure stays in the sink
    assert_eq!(String::from_utf8(out).unwrap(), "before ");
}

#[test]
fn test_missing_layout_fails_before_writing() {
    let dir = template_dir(&[("index.html", "x")]);
    let r = renderer(dir.path(), "layout.html");
    let mut out = Vec::new();
    let err = r.render(&mut out, "index.html", &Value::nil()).unwrap_err();
    assert!(matches!(err, RenderError::MissingLayout { .. }));
    assert!(out.is_empty());
}

#[test]
fn test_yield_failure_propagates() {
    let dir = template_dir(&[
        ("layout.html", "<body>{{yield}}</body>"),
        ("index.html", "{{.user.name}}"),
    ]);
    let r = renderer(dir.path(), "layout.html");
    let err = r.render_to_string("index.html", &Value::nil()).unwrap_err();
    match &err {
        RenderError::Execution {
            template,
            cause: ExecError::Nested { helper, .. },
            ..
        } => {
            assert_eq!(template, "layout.html");
            assert_eq!(*helper, "yield");
        }
        other => panic!("expected nested error, got {other}"),
    }
    assert_eq!(err.template(), Some("index.html"));
}

#[test]
fn test_block_failure_propagates() {
    let dir = template_dir(&[
        ("layout.html", "[{{block \"b.html\"}}]"),
        ("b.html", "{{.a.b}}"),
        ("index.html", "x"),
    ]);
    let r = renderer(dir.path(), "layout.html");
    let mut out = Vec::new();
    let err = r.render(&mut out, "index.html", &Value::nil()).unwrap_err();
    match &err {
        RenderError::Execution {
            template,
            cause: ExecError::Nested { helper, .. },
            ..
        } => {
            assert_eq!(template, "layout.html");
            assert_eq!(*helper, "block");
        }
        other => panic!("expected nested error, got {other}"),
    }
    assert_eq!(err.template(), Some("b.html"));
    assert_eq!(String::from_utf8(out).unwrap(), "[");
}

#[test]
fn test_nested_layouts_through_include() {
    let dir = template_dir(&[
        ("layout/outer.html", "<html>{{template \"layout/inner.html\" .}}</html>"),
        ("layout/inner.html", "<main>{{yield}}</main>"),
        ("index.html", "{{.}}"),
    ]);
    let r = renderer(dir.path(), "layout/outer.html");
    assert_eq!(
        r.render_to_string("index.html", &Value::from("hi")).unwrap(),
        "<html><main>hi</main></html>"
    );
}

#[test]
fn test_caller_funcs_and_later_bundles_win() {
    let dir = template_dir(&[("index.html", "{{greet .}}")]);
    let first = FuncMap::new().with("greet", |args| Ok(Value::from(format!("hi {}", args[0].to_text()))));
    let second = FuncMap::new().with("greet", |args| Ok(Value::from(format!("hello {}", args[0].to_text()))));
    let options = RenderOptions::new()
        .with_directory(dir.path())
        .with_funcs(first)
        .with_funcs(second);
    let r = HtmlRenderer::new(options).unwrap();
    assert_eq!(r.render_to_string("index.html", &Value::from("bo")).unwrap(), "hello bo");
}

#[test]
fn test_caller_func_error() {
    let dir = template_dir(&[("index.html", "{{check}}")]);
    let funcs = FuncMap::new().with("check", |_| Err(FuncError::new("not allowed")));
    let options = RenderOptions::new().with_directory(dir.path()).with_funcs(funcs);
    let r = HtmlRenderer::new(options).unwrap();
    let err = r.render_to_string("index.html", &Value::nil()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"template: index.html: error calling check: not allowed");
}

#[test]
fn test_custom_delims_and_extensions() {
    let dir = template_dir(&[("mail.tmpl", "Dear <% .name %>, {{ kept }}"), ("page.html", "ignored")]);
    let options = RenderOptions::new()
        .with_directory(dir.path())
        .with_extensions([".tmpl"])
        .with_delims("<%", "%>");
    let r = HtmlRenderer::new(options).unwrap();
    assert!(!r.templates().contains("page.html"));
    let data = Value::from(json!({"name": "Ann"}));
    assert_eq!(r.render_to_string("mail.tmpl", &data).unwrap(), "Dear Ann, {{ kept }}");
}

#[test]
fn test_recompilation_is_idempotent() {
    let dir = template_dir(&[
        ("layout.html", "<body>{{yield}}</body>"),
        ("a.html", "A{{.}}"),
        ("b/c.html", "C"),
    ]);
    let options = RenderOptions::new().with_directory(dir.path()).with_layout("layout.html");
    let first = HtmlRenderer::new(options.clone()).unwrap();
    let second = HtmlRenderer::new(options).unwrap();

    let names = |r: &HtmlRenderer| r.templates().names().map(str::to_string).collect::<Vec<_>>();
    assert_eq!(names(&first), names(&second));
    for name in ["a.html", "b/c.html"] {
        assert_eq!(
            first.render_to_string(name, &Value::from(1i64)).unwrap(),
            second.render_to_string(name, &Value::from(1i64)).unwrap()
        );
    }
}

#[test]
fn test_concurrent_renders_are_isolated() {
    let dir = template_dir(&[
        ("layout.html", "{{current}}:{{yield}}"),
        ("a.html", "A{{.}}"),
        ("b.html", "B{{.}}"),
    ]);
    let r = renderer(dir.path(), "layout.html");

    std::thread::scope(|s| {
        for i in 0..16usize {
            let r = &r;
            s.spawn(move || {
                let name = if i % 2 == 0 { "a.html" } else { "b.html" };
                let expected = format!("{}:{}{}", name, &name[..1].to_uppercase(), i);
                for _ in 0..50 {
                    let out = r.render_to_string(name, &Value::from(i)).unwrap();
                    assert_eq!(out, expected);
                }
            });
        }
    });
}

#[test]
fn test_renderer_trait_object() {
    let dir = template_dir(&[("index.html", "ok")]);
    let r: Box<dyn Renderer> = Box::new(renderer(dir.path(), ""));
    let mut out = Vec::new();
    r.render(&mut out, "index.html", &Value::nil()).unwrap();
    assert_eq!(out, b"ok");
}
