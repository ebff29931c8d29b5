use crate::i18n::Language;
use crate::text::{clean_html, normalize_body};
use crate::urls;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Fields that carry per-language text. A translation row owns its own copy
/// of each; nothing is read from the source post when one is missing.
pub const TRANSLATED_FIELDS: &[&str] = &[
    "title",
    "subtitle",
    "lede",
    "body",
    "discover_box",
    "numbers_box",
    "links",
];

/// Which side of the source/translation relation a row is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostVariant {
    /// Written in the default language, not a translation of anything
    Canonical,
    /// Translation of a canonical post into another language
    Translation,
}

/// Per-post author credit, e.g. "Interview with".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorDescription {
    pub author_id: i64,
    #[serde(default)]
    pub description: String,
}

/// Translatable text of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub lede: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub discover_box: String,
    #[serde(default)]
    pub numbers_box: String,
    #[serde(default)]
    pub links: String,
}

/// A blog post row. Canonical posts and their translations share this type
/// and one storage table keyed by `slug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub slug: String,
    pub lang: Language,
    /// Slug of the canonical post this row translates
    pub source: Option<String>,
    #[serde(flatten)]
    pub content: PostContent,
    /// Archive id of the banner image
    pub banner: Option<String>,
    pub category_id: Option<i64>,
    pub authors: Vec<AuthorDescription>,
    pub tags: Vec<i64>,
    pub release_date: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub published: bool,
}

impl Post {
    pub fn variant(&self) -> PostVariant {
        if self.source.is_some() {
            PostVariant::Translation
        } else {
            PostVariant::Canonical
        }
    }

    pub fn is_translation(&self) -> bool {
        self.variant() == PostVariant::Translation
    }

    /// Slug of the canonical post: the source for translations, the row's
    /// own slug otherwise.
    pub fn canonical_slug(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.slug)
    }

    /// Replace no-break spaces in the body. Runs before every save.
    pub fn normalize_body(&mut self) {
        if let Cow::Owned(body) = normalize_body(&self.content.body) {
            self.content.body = body;
        }
    }

    /// Sanitize the rich-text fields. Runs after `normalize_body`.
    pub fn clean_html_fields(&mut self) {
        let c = &mut self.content;
        for field in [
            &mut c.body,
            &mut c.discover_box,
            &mut c.numbers_box,
            &mut c.links,
        ] {
            *field = clean_html(field);
        }
    }

    pub fn path(&self) -> String {
        urls::post_path(self.canonical_slug(), self.lang)
    }

    pub fn absolute_url(&self, domain: &str) -> String {
        urls::absolute_url(domain, &self.path())
    }

    /// Open Graph title
    pub fn og_title(&self) -> String {
        let mut title = format!("Blog: {}", self.content.title);
        if !self.content.subtitle.is_empty() {
            title.push(' ');
            title.push_str(&self.content.subtitle);
        }
        title
    }

    /// Image used for social previews.
    pub fn main_visual(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Whether the post is visible on the public site at `now`.
    pub fn is_public(&self, now: DateTime<Utc>) -> bool {
        self.published && self.release_date.map(|d| d <= now).unwrap_or(false)
    }
}

/// Fields submitted by the editing surface for a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostInput {
    #[serde(default)]
    pub slug: String,
    #[serde(flatten)]
    pub content: PostContent,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub authors: Vec<AuthorDescription>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published: bool,
}

impl PostInput {
    /// Build a brand-new row.
    pub fn into_post(self, lang: Language, source: Option<String>, now: DateTime<Utc>) -> Post {
        Post {
            slug: self.slug.trim().to_string(),
            lang,
            source,
            content: self.content,
            banner: self.banner.filter(|b| !b.is_empty()),
            category_id: self.category_id,
            authors: self.authors,
            tags: dedup(self.tags),
            release_date: self.release_date,
            created: now,
            last_modified: now,
            published: self.published,
        }
    }

    /// Apply an edit to an existing row. Fields named in `readonly` keep
    /// their stored values whatever the submission says.
    pub fn merge_into(self, existing: &Post, readonly: &[&str], now: DateTime<Utc>) -> Post {
        let keep = |field: &str| readonly.contains(&field);
        let mut post = self.into_post(existing.lang, existing.source.clone(), now);

        if keep("slug") {
            post.slug = existing.slug.clone();
        }
        if keep("release_date") {
            post.release_date = existing.release_date;
        }
        post.created = existing.created;
        post
    }

    /// Prefill an input from an existing row (translation duplication).
    pub fn from_post(post: &Post) -> Self {
        Self {
            slug: post.slug.clone(),
            content: post.content.clone(),
            banner: post.banner.clone(),
            category_id: post.category_id,
            authors: post.authors.clone(),
            tags: post.tags.clone(),
            release_date: post.release_date,
            published: post.published,
        }
    }
}

/// Fields submitted when creating or editing a translation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationInput {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub lang: String,
    #[serde(flatten)]
    pub post: PostInput,
}

fn dedup(mut ids: Vec<i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(now: DateTime<Utc>) -> Post {
        PostInput {
            slug: " first-light ".to_string(),
            content: PostContent {
                title: "First light".to_string(),
                body: "a\u{a0}b".to_string(),
                ..Default::default()
            },
            tags: vec![3, 1, 3],
            ..Default::default()
        }
        .into_post(Language::ENGLISH, None, now)
    }

    #[test]
    fn test_into_post_trims_and_dedups() {
        let now = Utc::now();
        let post = sample(now);

        assert_eq!(post.slug, "first-light");
        assert_eq!(post.tags, vec![3, 1]);
        assert_eq!(post.created, now);
        assert_eq!(post.variant(), PostVariant::Canonical);
    }

    #[test]
    fn test_normalize_body() {
        let mut post = sample(Utc::now());
        post.normalize_body();
        assert_eq!(post.content.body, "a b");
    }

    #[test]
    fn test_clean_html_fields() {
        let mut post = sample(Utc::now());
        post.content.title = "<b>Title</b>".to_string();
        post.content.body = "<p>ok</p><script>x()</script>".to_string();
        post.content.discover_box = r#"<a href="javascript:x()">a</a>"#.to_string();
        post.content.numbers_box = "<iframe src=\"x\"></iframe>3".to_string();
        post.content.links = "<ul><li>l</li></ul>".to_string();
        post.clean_html_fields();

        assert_eq!(post.content.body, "<p>ok</p>");
        assert!(!post.content.discover_box.contains("javascript"));
        assert_eq!(post.content.numbers_box, "3");
        assert_eq!(post.content.links, "<ul><li>l</li></ul>");
        // Plain text fields are left alone
        assert_eq!(post.content.title, "<b>Title</b>");
    }

    #[test]
    fn test_translation_variant_and_path() {
        let mut post = sample(Utc::now());
        post.slug = "first-light-de".to_string();
        post.lang = Language::GERMAN;
        post.source = Some("first-light".to_string());

        assert!(post.is_translation());
        assert_eq!(post.canonical_slug(), "first-light");
        assert_eq!(post.path(), "/de/public/blog/first-light/");
        assert_eq!(
            post.absolute_url("www.example.org"),
            "https://www.example.org/de/public/blog/first-light/"
        );
    }

    #[test]
    fn test_og_title() {
        let mut post = sample(Utc::now());
        assert_eq!(post.og_title(), "Blog: First light");

        post.content.subtitle = "at the ELT".to_string();
        assert_eq!(post.og_title(), "Blog: First light at the ELT");
    }

    #[test]
    fn test_merge_keeps_readonly_fields() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut existing = sample(created);
        existing.release_date = Some(created);

        let edit = PostInput {
            slug: "renamed".to_string(),
            release_date: Some(Utc::now()),
            content: PostContent {
                title: "Edited".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let now = Utc::now();
        let merged = edit.merge_into(&existing, &["slug", "release_date"], now);

        assert_eq!(merged.slug, "first-light");
        assert_eq!(merged.release_date, Some(created));
        assert_eq!(merged.created, created);
        assert_eq!(merged.last_modified, now);
        assert_eq!(merged.content.title, "Edited");
    }

    #[test]
    fn test_merge_without_readonly_takes_submission() {
        let existing = sample(Utc::now());
        let edit = PostInput {
            slug: "new-slug".to_string(),
            ..Default::default()
        };
        let merged = edit.merge_into(&existing, &[], Utc::now());
        assert_eq!(merged.slug, "new-slug");
    }

    #[test]
    fn test_is_public() {
        let now = Utc::now();
        let mut post = sample(now);
        assert!(!post.is_public(now), "no release date");

        post.release_date = Some(now - chrono::Duration::hours(1));
        assert!(!post.is_public(now), "unpublished");

        post.published = true;
        assert!(post.is_public(now));

        post.release_date = Some(now + chrono::Duration::hours(1));
        assert!(!post.is_public(now), "embargoed");
    }

    #[test]
    fn test_translation_input_deserializes_flat() {
        let json = r#"{
            "source": "first-light",
            "lang": "de",
            "slug": "first-light-de",
            "title": "Erstes Licht",
            "tags": [1]
        }"#;
        let input: TranslationInput = serde_json::from_str(json).expect("deserialize");
        assert_eq!(input.source.as_deref(), Some("first-light"));
        assert_eq!(input.post.slug, "first-light-de");
        assert_eq!(input.post.content.title, "Erstes Licht");
        assert_eq!(input.post.tags, vec![1]);
    }
}
