//! Renders the demo site under `demos/` through its configuration file

use std::path::PathBuf;

use layout_render::{HtmlRenderer, RenderOptions, Value};
use pretty_assertions::assert_eq;

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos")
}

fn demo_renderer() -> HtmlRenderer {
    let options = RenderOptions::from_file(&demos().join("render.toml")).expect("demo config should load");
    HtmlRenderer::new(options).expect("demo templates should compile")
}

fn demo_data() -> Value {
    let text = std::fs::read_to_string(demos().join("data.json")).unwrap();
    Value::Data(serde_json::from_str(&text).unwrap())
}

#[test]
fn test_demo_templates_compile() {
    let renderer = demo_renderer();
    let names: Vec<_> = renderer.templates().names().collect();
    for name in [
        "index.html",
        "layout/layout.html",
        "partials/sidebar.html",
        "shared/view.html",
    ] {
        assert!(names.contains(&name), "missing {name} in {names:?}");
    }
    assert_eq!(renderer.options().layout, "layout/layout.html");
}

#[test]
fn test_demo_index_page() {
    let out = demo_renderer().render_to_string("index.html", &demo_data()).unwrap();
    let expected = r#"<!DOCTYPE html>
<html>
<head><title>Demo</title></head>
<body>
<nav><a href="/">Home</a><a href="/view">View</a></nav>

<main><h1>Welcome to &lt;layout-render&gt;</h1>
</main>
</body>
</html>
"#;
    assert_eq!(out, expected);
}

#[test]
fn test_demo_view_page() {
    let out = demo_renderer().render_to_string("shared/view.html", &demo_data()).unwrap();
    let main = out
        .split("<main>")
        .nth(1)
        .and_then(|rest| rest.split("</main>").next())
        .unwrap();
    let expected = r#"<p>Welcome to &lt;layout-render&gt;</p>
<ul>
  <li data-index="0">one</li>
  <li data-index="1">two</li>
</ul>
"#;
    assert_eq!(main, expected);
}

#[test]
fn test_demo_title_falls_back_to_current() {
    let empty = Value::Data(serde_json::json!({}));
    let out = demo_renderer().render_to_string("index.html", &empty).unwrap();
    assert!(out.contains("<title>index.html</title>"));
    assert!(out.contains("<nav></nav>"));
}
