use super::{release_order, BlogStore, PostQuery, StoreResult};
use crate::error::{Constraint, StoreError};
use crate::i18n::Language;
use crate::models::{Author, AuthorInput, Category, CategoryInput, Post, Tag, TagInput};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    posts: BTreeMap<String, Post>,
    authors: BTreeMap<i64, Author>,
    categories: BTreeMap<i64, Category>,
    tags: BTreeMap<i64, Tag>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Referential checks shared by insert and update.
    fn check_references(&self, post: &Post) -> StoreResult<()> {
        if let Some(source) = &post.source {
            if !self.posts.contains_key(source) {
                return Err(StoreError::Conflict(Constraint::Reference));
            }
        }
        if let Some(category) = post.category_id {
            if !self.categories.contains_key(&category) {
                return Err(StoreError::Conflict(Constraint::Reference));
            }
        }
        let authors_ok = post
            .authors
            .iter()
            .all(|a| self.authors.contains_key(&a.author_id));
        let tags_ok = post.tags.iter().all(|t| self.tags.contains_key(t));
        if !authors_ok || !tags_ok {
            return Err(StoreError::Conflict(Constraint::Reference));
        }
        Ok(())
    }

    /// `UNIQUE (source_id, lang)`, ignoring the row stored under `replacing`.
    fn check_source_lang(&self, post: &Post, replacing: &str) -> StoreResult<()> {
        let Some(source) = &post.source else {
            return Ok(());
        };
        let clash = self.posts.values().any(|other| {
            other.slug != replacing
                && other.slug != post.slug
                && other.source.as_deref() == Some(source.as_str())
                && other.lang == post.lang
        });
        if clash {
            return Err(StoreError::Conflict(Constraint::SourceLanguage));
        }
        Ok(())
    }

    fn category_slug_taken(&self, input: &CategoryInput, except: Option<i64>) -> bool {
        self.categories
            .values()
            .filter(|c| Some(c.id) != except)
            .any(|c| {
                c.slug.default == input.slug.default
                    || input.slug.translations.iter().any(|(lang, slug)| {
                        !slug.is_empty() && c.slug.translations.get(lang) == Some(slug)
                    })
            })
    }

    fn tag_slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.tags
            .values()
            .any(|t| Some(t.id) != except && t.slug == slug)
    }
}

/// In-process `BlogStore`.
///
/// Every method takes the lock once, so each call is atomic with respect
/// to the others.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn get_post(&self, slug: &str) -> StoreResult<Option<Post>> {
        Ok(self.inner.read().await.posts.get(slug).cloned())
    }

    async fn find_translation(&self, source: &str, lang: Language) -> StoreResult<Option<Post>> {
        let inner = self.inner.read().await;
        Ok(inner
            .posts
            .values()
            .find(|p| p.source.as_deref() == Some(source) && p.lang == lang)
            .cloned())
    }

    async fn translations_of(&self, source: &str) -> StoreResult<Vec<Post>> {
        let inner = self.inner.read().await;
        Ok(inner
            .posts
            .values()
            .filter(|p| p.source.as_deref() == Some(source))
            .cloned()
            .collect())
    }

    async fn list_posts(&self, query: &PostQuery) -> StoreResult<Vec<Post>> {
        let inner = self.inner.read().await;
        let mut posts: Vec<Post> = inner
            .posts
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        posts.sort_by(release_order);
        if let Some(limit) = query.limit {
            posts.truncate(limit);
        }
        Ok(posts)
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.posts.contains_key(&post.slug) {
            return Err(StoreError::Conflict(Constraint::PostSlug));
        }
        inner.check_source_lang(post, &post.slug)?;
        inner.check_references(post)?;
        inner.posts.insert(post.slug.clone(), post.clone());
        Ok(())
    }

    async fn update_post(&self, slug: &str, post: &Post) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.posts.contains_key(slug) {
            return Err(StoreError::NotFound("post"));
        }
        let renamed = post.slug != slug;
        if renamed && inner.posts.contains_key(&post.slug) {
            return Err(StoreError::Conflict(Constraint::PostSlug));
        }
        inner.check_source_lang(post, slug)?;
        inner.check_references(post)?;

        // Nothing has been modified before this point
        inner.posts.remove(slug);
        inner.posts.insert(post.slug.clone(), post.clone());
        if renamed {
            for translation in inner.posts.values_mut() {
                if translation.source.as_deref() == Some(slug) {
                    translation.source = Some(post.slug.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete_post(&self, slug: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner
            .posts
            .values()
            .any(|p| p.source.as_deref() == Some(slug))
        {
            return Err(StoreError::Conflict(Constraint::Reference));
        }
        Ok(inner.posts.remove(slug).is_some())
    }

    async fn posts_by_author(&self, author_id: i64) -> StoreResult<Vec<Post>> {
        let inner = self.inner.read().await;
        Ok(inner
            .posts
            .values()
            .filter(|p| p.authors.iter().any(|a| a.author_id == author_id))
            .cloned()
            .collect())
    }

    async fn posts_by_category(&self, category_id: i64) -> StoreResult<Vec<Post>> {
        let inner = self.inner.read().await;
        Ok(inner
            .posts
            .values()
            .filter(|p| p.category_id == Some(category_id))
            .cloned()
            .collect())
    }

    // ==================== Authors ====================

    async fn get_author(&self, id: i64) -> StoreResult<Option<Author>> {
        Ok(self.inner.read().await.authors.get(&id).cloned())
    }

    async fn list_authors(&self) -> StoreResult<Vec<Author>> {
        let inner = self.inner.read().await;
        let mut authors: Vec<Author> = inner.authors.values().cloned().collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(authors)
    }

    async fn insert_author(&self, input: &AuthorInput) -> StoreResult<Author> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id();
        let author = input.clone().into_author(id);
        inner.authors.insert(id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: i64, input: &AuthorInput) -> StoreResult<Author> {
        let mut inner = self.inner.write().await;
        if !inner.authors.contains_key(&id) {
            return Err(StoreError::NotFound("author"));
        }
        let author = input.clone().into_author(id);
        inner.authors.insert(id, author.clone());
        Ok(author)
    }

    async fn delete_author(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.authors.remove(&id).is_some();
        if removed {
            for post in inner.posts.values_mut() {
                post.authors.retain(|a| a.author_id != id);
            }
        }
        Ok(removed)
    }

    // ==================== Categories ====================

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(self.inner.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let inner = self.inner.read().await;
        let mut categories: Vec<Category> = inner.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.default.cmp(&b.name.default).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn insert_category(&self, input: &CategoryInput) -> StoreResult<Category> {
        let mut inner = self.inner.write().await;
        if inner.category_slug_taken(input, None) {
            return Err(StoreError::Conflict(Constraint::CategorySlug));
        }
        let id = inner.next_id();
        let category = input.clone().into_category(id);
        inner.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, input: &CategoryInput) -> StoreResult<Category> {
        let mut inner = self.inner.write().await;
        if !inner.categories.contains_key(&id) {
            return Err(StoreError::NotFound("category"));
        }
        if inner.category_slug_taken(input, Some(id)) {
            return Err(StoreError::Conflict(Constraint::CategorySlug));
        }
        let category = input.clone().into_category(id);
        inner.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.posts.values().any(|p| p.category_id == Some(id)) {
            return Err(StoreError::Conflict(Constraint::Reference));
        }
        Ok(inner.categories.remove(&id).is_some())
    }

    // ==================== Tags ====================

    async fn get_tag(&self, id: i64) -> StoreResult<Option<Tag>> {
        Ok(self.inner.read().await.tags.get(&id).cloned())
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let inner = self.inner.read().await;
        let mut tags: Vec<Tag> = inner.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    async fn insert_tag(&self, input: &TagInput) -> StoreResult<Tag> {
        let mut inner = self.inner.write().await;
        if inner.tag_slug_taken(&input.slug, None) {
            return Err(StoreError::Conflict(Constraint::TagSlug));
        }
        let id = inner.next_id();
        let tag = input.clone().into_tag(id);
        inner.tags.insert(id, tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, id: i64, input: &TagInput) -> StoreResult<Tag> {
        let mut inner = self.inner.write().await;
        if !inner.tags.contains_key(&id) {
            return Err(StoreError::NotFound("tag"));
        }
        if inner.tag_slug_taken(&input.slug, Some(id)) {
            return Err(StoreError::Conflict(Constraint::TagSlug));
        }
        let tag = input.clone().into_tag(id);
        inner.tags.insert(id, tag.clone());
        Ok(tag)
    }

    async fn delete_tag(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.tags.remove(&id).is_some();
        if removed {
            for post in inner.posts.values_mut() {
                post.tags.retain(|t| *t != id);
            }
        }
        Ok(removed)
    }
}
