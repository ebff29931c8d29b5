//! Cache of rendered read-API post representations.

use crate::i18n::Language;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// Entries expire even without an explicit invalidation.
const RENDER_TTL_SECS: u64 = 3600;

/// Rendered posts keyed by canonical slug and language.
#[async_trait]
pub trait RenderCache: Send + Sync {
    async fn get(&self, canonical_slug: &str, lang: Language) -> Option<String>;

    async fn insert(&self, canonical_slug: &str, lang: Language, rendered: String);

    /// Drop every language version of a post.
    async fn invalidate_post(&self, canonical_slug: &str);
}

#[derive(Clone)]
pub struct MokaRenderCache {
    entries: Cache<(String, Language), String>,
}

impl MokaRenderCache {
    pub fn new(capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(RENDER_TTL_SECS))
            .build();
        Self { entries }
    }
}

#[async_trait]
impl RenderCache for MokaRenderCache {
    async fn get(&self, canonical_slug: &str, lang: Language) -> Option<String> {
        self.entries.get(&(canonical_slug.to_string(), lang)).await
    }

    async fn insert(&self, canonical_slug: &str, lang: Language, rendered: String) {
        self.entries
            .insert((canonical_slug.to_string(), lang), rendered)
            .await;
    }

    async fn invalidate_post(&self, canonical_slug: &str) {
        for lang in Language::enabled() {
            self.entries
                .invalidate(&(canonical_slug.to_string(), lang))
                .await;
        }
        debug!(slug = %canonical_slug, "render cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = MokaRenderCache::new(100);
        cache
            .insert("first-light", Language::GERMAN, "{}".to_string())
            .await;

        assert_eq!(
            cache.get("first-light", Language::GERMAN).await.as_deref(),
            Some("{}")
        );
        assert!(cache.get("first-light", Language::ENGLISH).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_drops_all_languages() {
        let cache = MokaRenderCache::new(100);
        cache.insert("a", Language::ENGLISH, "en".to_string()).await;
        cache.insert("a", Language::GERMAN, "de".to_string()).await;
        cache.insert("b", Language::ENGLISH, "other".to_string()).await;

        cache.invalidate_post("a").await;

        assert!(cache.get("a", Language::ENGLISH).await.is_none());
        assert!(cache.get("a", Language::GERMAN).await.is_none());
        assert!(cache.get("b", Language::ENGLISH).await.is_some());
    }
}
