//! Tera templates: the shared engine, the syntax validator for post bodies
//! and the render self-test shown to editors.

use crate::error::ValidationError;
use anyhow::{Context as _, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error as StdError;
use std::path::Path;
use std::sync::OnceLock;
use tera::{Context, Tera};
use tracing::debug;

pub const POST_DESCRIPTION: &str = "feeds/post_description.html";
pub const CATEGORIES_LIST: &str = "blog/categories_list.html";

/// Name under which ad-hoc sources (post bodies) are compiled.
const INLINE_TEMPLATE: &str = "__inline__";

/// Templates used when the template directory does not provide its own.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        POST_DESCRIPTION,
        "{% if post.subtitle %}<p><strong>{{ post.subtitle }}</strong></p>\n{% endif %}\
         {{ post.lede | safe }}",
    ),
    (
        CATEGORIES_LIST,
        "<ul class=\"blog-categories\">\
         {% for category in categories %}\
         <li><a href=\"{{ category.url }}\">{{ category.name }}</a></li>\
         {% endfor %}</ul>",
    ),
];

static POSITION_REGEX: OnceLock<Regex> = OnceLock::new();

fn position_regex() -> &'static Regex {
    POSITION_REGEX.get_or_init(|| Regex::new(r"-->\s*(\d+):(\d+)").expect("Invalid position regex"))
}

/// Template engine shared by the feed, the helpers and the render self-test.
#[derive(Clone)]
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load `{dir}/**/*.html` when a directory is given, then add the
    /// built-in templates the directory does not override.
    pub fn new(template_dir: Option<&Path>) -> Result<Self> {
        let mut tera = match template_dir {
            Some(dir) => {
                let pattern = dir.join("**/*.html");
                let pattern_str = pattern
                    .to_str()
                    .context("invalid template directory path")?;
                Tera::new(pattern_str).context("failed to initialize Tera templates")?
            }
            None => Tera::default(),
        };

        let loaded: HashSet<String> = tera.get_template_names().map(str::to_string).collect();
        for (name, source) in BUILTIN_TEMPLATES {
            if !loaded.contains(*name) {
                tera.add_raw_template(name, source)
                    .with_context(|| format!("failed to add built-in template {}", name))?;
            }
        }

        crate::helpers::register(&mut tera);
        debug!(count = tera.get_template_names().count(), "loaded templates");

        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> tera::Result<String> {
        self.tera.render(name, context)
    }

    /// Render a template source with the registered helpers, capturing the
    /// failure instead of returning it. `None` means it rendered cleanly.
    pub fn debug_render(&self, source: &str, context: &Context) -> Option<TemplateDebug> {
        let mut tera = self.tera.clone();
        if let Err(e) = tera.add_raw_template(INLINE_TEMPLATE, source) {
            let kind = if parsed_before_failure(&tera, &e) {
                TemplateErrorKind::Render
            } else {
                TemplateErrorKind::Syntax
            };
            return Some(TemplateDebug::from_error(kind, &e));
        }
        match tera.render(INLINE_TEMPLATE, context) {
            Ok(_) => None,
            Err(e) => Some(TemplateDebug::from_error(TemplateErrorKind::Render, &e)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateErrorKind {
    Syntax,
    Render,
}

/// Structured description of a template failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDebug {
    pub kind: TemplateErrorKind,
    pub message: String,
    /// Underlying errors, outermost first
    pub causes: Vec<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl TemplateDebug {
    fn from_error(kind: TemplateErrorKind, error: &tera::Error) -> Self {
        let causes = error_chain(error);
        let (line, column) = std::iter::once(error.to_string())
            .chain(causes.iter().cloned())
            .find_map(|text| {
                let caps = position_regex().captures(&text)?;
                Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
            })
            .map_or((None, None), |(l, c)| (Some(l), Some(c)));

        Self {
            kind,
            message: error.to_string(),
            causes,
            line,
            column,
        }
    }
}

fn error_chain(error: &tera::Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    causes
}

/// Whether `add_raw_template` failed after the source parsed. Tera registers
/// the template and then resolves `extends` parents and macro imports, so a
/// registered template means the failure is a missing reference.
fn parsed_before_failure(tera: &Tera, error: &tera::Error) -> bool {
    matches!(error.kind, tera::ErrorKind::MissingParent { .. })
        || tera.get_template_names().any(|name| name == INLINE_TEMPLATE)
}

/// Reject values that do not parse as templates.
///
/// Parents and macro files that are not loaded are render-time problems, as
/// are missing variables and unknown functions; none of them are reported.
pub fn validate_template(value: &str) -> Result<(), ValidationError> {
    let mut tera = Tera::default();
    if let Err(e) = tera.add_raw_template(INLINE_TEMPLATE, value) {
        if parsed_before_failure(&tera, &e) {
            debug!(error = %e, "Ignoring unresolved template reference during validation");
            return Ok(());
        }
        let detail = error_chain(&e).pop().unwrap_or_else(|| e.to_string());
        return Err(ValidationError::general(format!(
            "{} is not a valid string format",
            detail.trim()
        )));
    }
    if let Err(e) = tera.render(INLINE_TEMPLATE, &Context::new()) {
        debug!(error = %e, "Ignoring template render error during validation");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== Validator ====================

    #[test]
    fn test_valid_template_passes() {
        assert!(validate_template("{{ name }}").is_ok());
        assert!(validate_template("plain text").is_ok());
        assert!(validate_template("").is_ok());
    }

    #[test]
    fn test_syntax_error_reported() {
        let error = validate_template("{% if %}").expect_err("should fail");
        assert!(error.message.ends_with("is not a valid string format"));
    }

    #[test]
    fn test_unclosed_block_reported() {
        assert!(validate_template("{% for x in items %}{{ x }}").is_err());
    }

    #[test]
    fn test_unloaded_parent_is_not_a_syntax_error() {
        let child = r#"{% extends "base.html" %}{% block c %}x{% endblock c %}"#;
        assert!(validate_template(child).is_ok());
    }

    #[test]
    fn test_unloaded_macro_file_is_not_a_syntax_error() {
        let value = r#"{% import "macros.html" as m %}{{ m::hello() }}"#;
        assert!(validate_template(value).is_ok());
    }

    #[test]
    fn test_broken_child_still_reported() {
        let child = r#"{% extends "base.html" %}{% block c %}{% if %}{% endblock c %}"#;
        assert!(validate_template(child).is_err());
    }

    #[test]
    fn test_render_errors_ignored() {
        // Unknown function only fails at render time
        assert!(validate_template("{{ missing_fn() }}").is_ok());
        assert!(validate_template("{{ a.b.c }}").is_ok());
    }

    // ==================== Engine ====================

    #[test]
    fn test_builtins_available() {
        let engine = TemplateEngine::new(None).expect("engine");
        let mut context = Context::new();
        context.insert(
            "post",
            &serde_json::json!({"subtitle": "Sub", "lede": "<em>Lede</em>"}),
        );

        let html = engine.render(POST_DESCRIPTION, &context).expect("render");
        assert!(html.contains("<strong>Sub</strong>"));
        assert!(html.contains("<em>Lede</em>"));
    }

    #[test]
    fn test_directory_overrides_builtin() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("feeds")).expect("mkdir");
        std::fs::write(
            dir.path().join("feeds/post_description.html"),
            "custom {{ post.lede }}",
        )
        .expect("write");

        let engine = TemplateEngine::new(Some(dir.path())).expect("engine");
        let mut context = Context::new();
        context.insert("post", &serde_json::json!({"subtitle": "", "lede": "x"}));

        assert_eq!(engine.render(POST_DESCRIPTION, &context).expect("render"), "custom x");
        assert!(engine.render(CATEGORIES_LIST, &{
            let mut c = Context::new();
            c.insert("categories", &Vec::<String>::new());
            c
        })
        .is_ok());
    }

    #[test]
    fn test_directory_resolves_parents_and_macros() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("base.html"),
            "<main>{% block content %}{% endblock content %}</main>",
        )
        .expect("write");
        std::fs::write(
            dir.path().join("macros.html"),
            "{% macro hello(name) %}Hello {{ name }}{% endmacro hello %}",
        )
        .expect("write");
        std::fs::write(
            dir.path().join("child.html"),
            r#"{% extends "base.html" %}{% import "macros.html" as m %}{% block content %}{{ m::hello(name="Vega") }}{% endblock content %}"#,
        )
        .expect("write");

        let engine = TemplateEngine::new(Some(dir.path())).expect("engine");
        let html = engine.render("child.html", &Context::new()).expect("render");
        assert_eq!(html, "<main>Hello Vega</main>");
    }

    // ==================== Debug Render ====================

    #[test]
    fn test_debug_render_clean() {
        let engine = TemplateEngine::new(None).expect("engine");
        assert!(engine
            .debug_render(r#"{{ dyk(text="Hello") }}"#, &Context::new())
            .is_none());
    }

    #[test]
    fn test_debug_render_syntax_position() {
        let engine = TemplateEngine::new(None).expect("engine");
        let debug = engine
            .debug_render("line one\n{% if %}", &Context::new())
            .expect("should fail");

        assert_eq!(debug.kind, TemplateErrorKind::Syntax);
        assert_eq!(debug.line, Some(2));
        assert!(debug.column.is_some());
        assert!(!debug.causes.is_empty());
    }

    #[test]
    fn test_debug_render_runtime_failure() {
        let engine = TemplateEngine::new(None).expect("engine");
        let debug = engine
            .debug_render("{{ not_a_function() }}", &Context::new())
            .expect("should fail");
        assert_eq!(debug.kind, TemplateErrorKind::Render);
        assert_eq!(debug.line, None);
    }
}
