//! Read-API representations of posts and categories.

use crate::error::{BlogError, BlogResult};
use crate::i18n::Language;
use crate::media::ImageArchive;
use crate::models::{Category, Post};
use crate::store::BlogStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use anyhow::anyhow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResource {
    pub name: String,
}

impl CategoryResource {
    pub fn new(category: &Category, lang: Language) -> Self {
        Self {
            name: category.name.get(lang).to_string(),
        }
    }
}

/// One author credit of a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorResource {
    pub name: String,
    pub description: String,
    /// Rendition name to URL, `null` without an archive photo
    pub photo: Option<BTreeMap<String, String>>,
    pub static_photo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResource {
    pub slug: String,
    pub url: String,
    pub title: String,
    pub subtitle: String,
    pub banner: Option<BTreeMap<String, String>>,
    pub authors: Vec<AuthorResource>,
    pub category: Option<CategoryResource>,
    pub lede: String,
    pub release_date: Option<DateTime<Utc>>,
}

fn renditions(archive: &ImageArchive, id: &str) -> BTreeMap<String, String> {
    archive
        .urls(id)
        .into_iter()
        .map(|(name, url)| (name.to_string(), url))
        .collect()
}

impl PostResource {
    /// Build the representation, resolving authors and category.
    ///
    /// Fails when a credited author row is missing.
    pub async fn build(
        store: &dyn BlogStore,
        archive: &ImageArchive,
        site_domain: &str,
        post: &Post,
    ) -> BlogResult<Self> {
        let mut authors = Vec::with_capacity(post.authors.len());
        for credit in &post.authors {
            let author = store.get_author(credit.author_id).await?.ok_or_else(|| {
                BlogError::Internal(anyhow!(
                    "post {} credits missing author {}",
                    post.slug,
                    credit.author_id
                ))
            })?;
            authors.push(AuthorResource {
                name: author.name,
                description: credit.description.clone(),
                photo: author.photo.as_deref().map(|id| renditions(archive, id)),
                static_photo: author.static_photo,
            });
        }

        let category = match post.category_id {
            Some(id) => store
                .get_category(id)
                .await?
                .map(|c| CategoryResource::new(&c, post.lang)),
            None => None,
        };

        Ok(Self {
            slug: post.slug.clone(),
            url: post.absolute_url(site_domain),
            title: post.content.title.clone(),
            subtitle: post.content.subtitle.clone(),
            banner: post.banner.as_deref().map(|id| renditions(archive, id)),
            authors,
            category,
            lede: post.content.lede.clone(),
            release_date: post.release_date,
        })
    }
}
