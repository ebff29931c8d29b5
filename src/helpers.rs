//! HTML helpers available to post bodies and page templates.

use crate::i18n::Language;
use crate::models::Category;
use crate::templates::{TemplateEngine, CATEGORIES_LIST};
use serde::Serialize;
use std::collections::HashMap;
use tera::{escape_html, Context, Tera, Value};

/// Autoplaying, looping, muted video element. Empty when there is no source.
pub fn blog_video(src: &str, fullwidth: bool) -> String {
    if src.is_empty() {
        return String::new();
    }
    format!(
        r#"<video src="{}" class="{}" autoplay="autoplay" loop="loop" muted="muted" width="100%"></video>"#,
        escape_html(src),
        if fullwidth { "fullwidth" } else { "" }
    )
}

/// "Did you know" box. Empty when there is no text.
pub fn dyk(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    format!(
        r#"<div class="dyk"><span class="dyk__title">#DYK</span><p>{}</p></div>"#,
        escape_html(text)
    )
}

#[derive(Serialize)]
struct CategoryLink {
    name: String,
    url: String,
}

/// Render the category navigation list in `lang`.
pub fn list_blog_categories(
    engine: &TemplateEngine,
    categories: &[Category],
    lang: Language,
) -> tera::Result<String> {
    let links: Vec<CategoryLink> = categories
        .iter()
        .map(|c| CategoryLink {
            name: c.name.get(lang).to_string(),
            url: c.url(lang),
        })
        .collect();

    let mut context = Context::new();
    context.insert("categories", &links);
    context.insert("lang", lang.code());
    engine.render(CATEGORIES_LIST, &context)
}

/// Make `dyk` and `blog_video` callable from templates.
pub fn register(tera: &mut Tera) {
    tera.register_function("dyk", |args: &HashMap<String, Value>| {
        let text = args.get("text").and_then(Value::as_str).unwrap_or("");
        Ok(Value::String(dyk(text)))
    });

    tera.register_function("blog_video", |args: &HashMap<String, Value>| {
        let src = args.get("src").and_then(Value::as_str).unwrap_or("");
        let fullwidth = match args.get("fullwidth") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "True" || s == "true",
            _ => false,
        };
        Ok(Value::String(blog_video(src, fullwidth)))
    });
}
