//! Template engine
//!
//! This module provides HTML rendering using Tera.
//! Features:
//! - Default templates embedded in the binary
//! - Optional override directory: any `.html` file there replaces the
//!   embedded template of the same relative name
//! - Plain HTML fallback when a template cannot be rendered

use anyhow::{Context, Result};
use rust_embed::RustEmbed;
use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera, Value};

mod error;

pub use error::ThemeError;

/// Templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct DefaultTemplates;

/// Template rendered when a page fails with a server error
pub const SERVER_ERROR_TEMPLATE: &str = "pages/500.html";

/// Template engine for rendering pages
pub struct ThemeEngine {
    /// Tera template engine instance
    tera: Tera,
    /// Directory whose templates override the embedded ones
    override_path: Option<PathBuf>,
}

impl ThemeEngine {
    /// Create a template engine from the embedded templates, overlaid with
    /// the templates found in `override_path`.
    pub fn new(override_path: Option<&Path>) -> Result<Self> {
        let mut templates = embedded_templates()?;

        if let Some(dir) = override_path {
            if !dir.is_dir() {
                return Err(ThemeError::NotFound(dir.display().to_string()).into());
            }
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            tracing::info!(
                "Loaded {} template override(s) from {}",
                overrides.len(),
                dir.display()
            );
            templates.extend(overrides);
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(describe(&e)))?;
        tera.register_filter("linebreaksbr", linebreaksbr);

        Ok(Self {
            tera,
            override_path: override_path.map(Path::to_path_buf),
        })
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e))).into()
        })
    }

    /// Render a template, falling back to the server error template and
    /// then to a plain built-in page. Always produces HTML.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("{:#}", e);
                if template != SERVER_ERROR_TEMPLATE {
                    if let Ok(html) = self.render(SERVER_ERROR_TEMPLATE, context) {
                        return html;
                    }
                }
                Self::simple_error_page(500, "Server error")
            }
        }
    }

    /// Minimal error page that needs no templates
    pub fn simple_error_page(status: u16, title: &str) -> String {
        let title = tera::escape_html(title);
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{status} {title}</title>
</head>
<body>
    <h1>{status}</h1>
    <p>{title}</p>
    <p><a href="/">Home</a></p>
</body>
</html>"#
        )
    }

    /// Whether a template with this name is loaded
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    pub fn override_path(&self) -> Option<&Path> {
        self.override_path.as_deref()
    }
}

/// All embedded templates as (name, source) pairs
fn embedded_templates() -> Result<BTreeMap<String, String>> {
    let mut templates = BTreeMap::new();
    for name in DefaultTemplates::iter() {
        let file = DefaultTemplates::get(&name)
            .ok_or_else(|| ThemeError::TemplateError(format!("Missing embedded template {}", name)))?;
        let source = String::from_utf8(file.data.into_owned())
            .with_context(|| format!("Template {} is not UTF-8", name))?;
        templates.insert(name.into_owned(), source);
    }
    Ok(templates)
}

/// Collect `.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((template_name, content));
        }
    }
    Ok(())
}

/// Flatten a Tera error and its causes into one message
fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Escape text and turn line breaks into `<br>`; pair with `| safe`.
fn linebreaksbr(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("linebreaksbr expects a string"))?;
    let html = tera::escape_html(text)
        .replace("\r\n", "\n")
        .replace('\n', "<br>");
    Ok(Value::String(html))
}

#[cfg(test)]
mod tests;
