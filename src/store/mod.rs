//! Persistence for blog records.
//!
//! `BlogStore` is the seam between the blog service and storage. Two
//! implementations exist: `PgStore` (PostgreSQL through sqlx) for the server
//! and `MemoryStore` for tests and tooling. Both enforce the same unique and
//! referential constraints, reported as `StoreError::Conflict`.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::StoreError;
use crate::i18n::Language;
use crate::models::{
    Author, AuthorInput, Category, CategoryInput, Post, Tag, TagInput, TRANSLATED_FIELDS,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

pub type StoreResult<T> = Result<T, StoreError>;

/// Filters for listing posts. Results are ordered by release date, newest
/// first, posts without a release date last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostQuery {
    pub lang: Option<Language>,
    pub published: Option<bool>,
    /// Only posts released at or before this instant
    pub released_by: Option<DateTime<Utc>>,
    /// Only posts released strictly after this instant
    pub released_after: Option<DateTime<Utc>>,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    /// Case-insensitive match against slug and the translated text fields
    pub search: Option<String>,
    pub limit: Option<usize>,
}

impl PostQuery {
    /// Published posts whose release date has passed.
    pub fn public(lang: Language, now: DateTime<Utc>) -> Self {
        Self {
            lang: Some(lang),
            published: Some(true),
            released_by: Some(now),
            ..Default::default()
        }
    }

    /// Published posts held back until a future release date.
    pub fn staging(lang: Language, now: DateTime<Utc>) -> Self {
        Self {
            lang: Some(lang),
            published: Some(true),
            released_after: Some(now),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, post: &Post) -> bool {
        if self.lang.is_some_and(|lang| lang != post.lang) {
            return false;
        }
        if self.published.is_some_and(|p| p != post.published) {
            return false;
        }
        if let Some(by) = self.released_by {
            if !post.release_date.is_some_and(|d| d <= by) {
                return false;
            }
        }
        if let Some(after) = self.released_after {
            if !post.release_date.is_some_and(|d| d > after) {
                return false;
            }
        }
        if self.category_id.is_some() && self.category_id != post.category_id {
            return false;
        }
        if let Some(tag) = self.tag_id {
            if !post.tags.contains(&tag) {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let c = &post.content;
            let haystacks: [&str; 8] = [
                post.slug.as_str(),
                &c.title,
                &c.subtitle,
                &c.lede,
                &c.body,
                &c.links,
                &c.discover_box,
                &c.numbers_box,
            ];
            debug_assert_eq!(haystacks.len(), TRANSLATED_FIELDS.len() + 1);
            if !haystacks.iter().any(|h| h.to_lowercase().contains(&needle)) {
                return false;
            }
        }
        true
    }
}

/// Newest release first, undated last, then by slug.
pub fn release_order(a: &Post, b: &Post) -> Ordering {
    match (a.release_date, b.release_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.slug.cmp(&b.slug))
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    // ==================== Posts ====================

    async fn get_post(&self, slug: &str) -> StoreResult<Option<Post>>;

    /// The translation of `source` into `lang`, if one exists.
    async fn find_translation(&self, source: &str, lang: Language) -> StoreResult<Option<Post>>;

    async fn translations_of(&self, source: &str) -> StoreResult<Vec<Post>>;

    async fn list_posts(&self, query: &PostQuery) -> StoreResult<Vec<Post>>;

    /// Insert a row with its author descriptions and tag links.
    async fn insert_post(&self, post: &Post) -> StoreResult<()>;

    /// Replace the row stored under `slug` and its author descriptions and
    /// tags in one transaction. When `post.slug` differs the row is renamed,
    /// re-pointing translations, author descriptions and tag links.
    async fn update_post(&self, slug: &str, post: &Post) -> StoreResult<()>;

    /// Delete a row and the join rows it owns. Fails with
    /// `Conflict(Reference)` while translations still point at it.
    async fn delete_post(&self, slug: &str) -> StoreResult<bool>;

    async fn posts_by_author(&self, author_id: i64) -> StoreResult<Vec<Post>>;

    async fn posts_by_category(&self, category_id: i64) -> StoreResult<Vec<Post>>;

    // ==================== Authors ====================

    async fn get_author(&self, id: i64) -> StoreResult<Option<Author>>;
    async fn list_authors(&self) -> StoreResult<Vec<Author>>;
    async fn insert_author(&self, input: &AuthorInput) -> StoreResult<Author>;
    async fn update_author(&self, id: i64, input: &AuthorInput) -> StoreResult<Author>;
    async fn delete_author(&self, id: i64) -> StoreResult<bool>;

    // ==================== Categories ====================

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>>;
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn insert_category(&self, input: &CategoryInput) -> StoreResult<Category>;
    async fn update_category(&self, id: i64, input: &CategoryInput) -> StoreResult<Category>;
    /// Fails with `Conflict(Reference)` while posts use the category.
    async fn delete_category(&self, id: i64) -> StoreResult<bool>;

    // ==================== Tags ====================

    async fn get_tag(&self, id: i64) -> StoreResult<Option<Tag>>;
    /// Ordered by name.
    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;
    async fn insert_tag(&self, input: &TagInput) -> StoreResult<Tag>;
    async fn update_tag(&self, id: i64, input: &TagInput) -> StoreResult<Tag>;
    async fn delete_tag(&self, id: i64) -> StoreResult<bool>;
}
