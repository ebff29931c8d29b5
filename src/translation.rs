//! Translation consistency: the duplicate/missing-source guard and language
//! resolution of posts.

use crate::error::{BlogResult, StoreError, ValidationError, ValidationErrors};
use crate::i18n::Language;
use crate::models::Post;
use crate::store::{BlogStore, StoreResult};

pub const MISSING_SOURCE: &str = "You must provide a translation source.";
pub const DUPLICATE_TRANSLATION: &str = "Translation already exists for selected language.";
pub const DUPLICATE_SLUG: &str = "Post with this Slug already exists.";

/// Validates translation rows before they are written.
pub struct TranslationGuard<'a> {
    store: &'a dyn BlogStore,
}

impl<'a> TranslationGuard<'a> {
    pub fn new(store: &'a dyn BlogStore) -> Self {
        Self { store }
    }

    /// Reject a translation without a source, a second translation of the
    /// same source into the same language (on creation only) and a slug that
    /// is already taken.
    pub async fn validate(&self, candidate: &Post, is_new: bool) -> BlogResult<()> {
        let Some(source) = candidate.source.as_deref() else {
            return Err(ValidationErrors::from(ValidationError::general(MISSING_SOURCE)).into());
        };

        if is_new {
            match self.store.find_translation(source, candidate.lang).await {
                Ok(Some(_)) => {
                    return Err(ValidationErrors::from(ValidationError::field(
                        "lang",
                        DUPLICATE_TRANSLATION,
                    ))
                    .into());
                }
                Ok(None) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        validate_unique(self.store, candidate, is_new).await
    }
}

/// Slug uniqueness for new rows.
pub async fn validate_unique(store: &dyn BlogStore, post: &Post, is_new: bool) -> BlogResult<()> {
    if is_new && store.get_post(&post.slug).await?.is_some() {
        return Err(ValidationErrors::from(ValidationError::field("slug", DUPLICATE_SLUG)).into());
    }
    Ok(())
}

/// The version of a post in `lang`.
///
/// The canonical language yields the canonical row; any other language
/// yields its translation or nothing. Default-language content is never
/// returned for another language.
pub async fn post_for_language(
    store: &dyn BlogStore,
    canonical_slug: &str,
    lang: Language,
) -> StoreResult<Option<Post>> {
    if lang.is_canonical() {
        return Ok(store
            .get_post(canonical_slug)
            .await?
            .filter(|post| !post.is_translation()));
    }
    store.find_translation(canonical_slug, lang).await
}
