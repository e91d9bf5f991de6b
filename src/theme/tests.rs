//! Tests for the template engine

use super::*;
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

const PAGES: &[&str] = &[
    "base.html",
    "blog/index.html",
    "blog/category.html",
    "blog/profile.html",
    "blog/user.html",
    "blog/create.html",
    "blog/detail.html",
    "blog/comment.html",
    "pages/about.html",
    "pages/rules.html",
    "pages/404.html",
    "pages/403csrf.html",
    "pages/500.html",
    "registration/login.html",
    "registration/registration_form.html",
    "registration/logged_out.html",
];

fn write_template(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_embedded_templates_loaded() {
    let engine = ThemeEngine::new(None).unwrap();

    for name in PAGES {
        assert!(engine.has_template(name), "missing template {}", name);
    }
    assert!(engine.override_path().is_none());
}

#[test]
fn test_static_pages_render() {
    let engine = ThemeEngine::new(None).unwrap();
    let context = TeraContext::new();

    for name in ["pages/about.html", "pages/rules.html", "pages/404.html", "pages/403csrf.html", "pages/500.html"] {
        let html = engine.render(name, &context).unwrap_or_else(|e| panic!("{}: {:#}", name, e));
        assert!(html.contains("<html"), "{} should extend base.html", name);
    }
}

#[test]
fn test_override_directory_replaces_template() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "pages/about.html", "<p>Custom about {{ who }}</p>");

    let engine = ThemeEngine::new(Some(dir.path())).unwrap();
    let mut context = TeraContext::new();
    context.insert("who", "us");

    assert_eq!(engine.render("pages/about.html", &context).unwrap(), "<p>Custom about us</p>");
    // Untouched templates still come from the binary
    assert!(engine.has_template("pages/rules.html"));
    assert_eq!(engine.override_path(), Some(dir.path()));
}

#[test]
fn test_missing_override_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(ThemeEngine::new(Some(&dir.path().join("nope"))).is_err());
}

#[test]
fn test_broken_override_is_an_error() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "pages/rules.html", "{% if %}");
    assert!(ThemeEngine::new(Some(dir.path())).is_err());
}

#[test]
fn test_render_unknown_template_fails() {
    let engine = ThemeEngine::new(None).unwrap();
    let err = engine.render("nope.html", &TeraContext::new()).unwrap_err();
    assert!(err.to_string().contains("nope.html"));
}

#[test]
fn test_render_with_fallback_uses_server_error_page() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "broken.html", "{{ missing.field }}");
    write_template(dir.path(), "pages/500.html", "<p>oops</p>");

    let engine = ThemeEngine::new(Some(dir.path())).unwrap();
    assert_eq!(engine.render_with_fallback("broken.html", &TeraContext::new()), "<p>oops</p>");
}

#[test]
fn test_render_with_fallback_last_resort() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "pages/500.html", "{{ missing.field }}");

    let engine = ThemeEngine::new(Some(dir.path())).unwrap();
    let html = engine.render_with_fallback("pages/500.html", &TeraContext::new());
    assert!(html.contains("<h1>500</h1>"));
}

#[test]
fn test_simple_error_page_escapes_title() {
    let html = ThemeEngine::simple_error_page(404, "<script>");
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
}

#[test]
fn test_linebreaksbr_filter() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "text.html", "{{ body | linebreaksbr | safe }}");

    let engine = ThemeEngine::new(Some(dir.path())).unwrap();
    let mut context = TeraContext::new();
    context.insert("body", "one\r\ntwo\n<b>three</b>");

    assert_eq!(
        engine.render("text.html", &context).unwrap(),
        "one<br>two<br>&lt;b&gt;three&lt;&#x2F;b&gt;"
    );
}
