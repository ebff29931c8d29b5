//! Post-save notifications.
//!
//! The blog service calls every registered `SaveListener` after a storage
//! write has committed. Listener failures are logged and never undo or fail
//! the save.

use crate::cache::RenderCache;
use crate::models::{Author, Category, Post, Tag};
use crate::store::BlogStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// A record that has just been written.
#[derive(Debug, Clone, Copy)]
pub enum SavedEntity<'a> {
    Post(&'a Post),
    /// A post row went away (deleted, or renamed from this slug)
    PostRemoved { canonical_slug: &'a str },
    Author(&'a Author),
    Category(&'a Category),
    Tag(&'a Tag),
}

impl SavedEntity<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            SavedEntity::Post(_) | SavedEntity::PostRemoved { .. } => "post",
            SavedEntity::Author(_) => "author",
            SavedEntity::Category(_) => "category",
            SavedEntity::Tag(_) => "tag",
        }
    }
}

#[async_trait]
pub trait SaveListener: Send + Sync {
    async fn on_saved(&self, store: &dyn BlogStore, entity: SavedEntity<'_>) -> Result<()>;
}

/// Run every listener, logging failures.
pub async fn notify(
    listeners: &[Arc<dyn SaveListener>],
    store: &dyn BlogStore,
    entity: SavedEntity<'_>,
) {
    for listener in listeners {
        if let Err(e) = listener.on_saved(store, entity).await {
            warn!(kind = entity.kind(), error = %e, "Save listener failed");
        }
    }
}

/// Drops cached renderings of posts affected by a save.
pub struct CacheInvalidator {
    cache: Arc<dyn RenderCache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn RenderCache>) -> Self {
        Self { cache }
    }

    async fn invalidate_all(&self, posts: &[Post]) {
        let slugs: BTreeSet<&str> = posts.iter().map(Post::canonical_slug).collect();
        for slug in &slugs {
            self.cache.invalidate_post(slug).await;
        }
        debug!(count = slugs.len(), "Invalidated cached posts");
    }
}

#[async_trait]
impl SaveListener for CacheInvalidator {
    async fn on_saved(&self, store: &dyn BlogStore, entity: SavedEntity<'_>) -> Result<()> {
        match entity {
            SavedEntity::Post(post) => self.cache.invalidate_post(post.canonical_slug()).await,
            SavedEntity::PostRemoved { canonical_slug } => {
                self.cache.invalidate_post(canonical_slug).await
            }
            SavedEntity::Author(author) => {
                let posts = store.posts_by_author(author.id).await?;
                self.invalidate_all(&posts).await;
            }
            SavedEntity::Category(category) => {
                let posts = store.posts_by_category(category.id).await?;
                self.invalidate_all(&posts).await;
            }
            SavedEntity::Tag(_) => {}
        }
        Ok(())
    }
}
