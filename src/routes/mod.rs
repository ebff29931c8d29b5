//! HTTP surface: the public read API and feed, and the key-protected admin
//! endpoints.

mod admin;
mod public;

use crate::blog::{Blog, BlogSettings};
use crate::cache::{MokaRenderCache, RenderCache};
use crate::config::Config;
use crate::error::BlogError;
use crate::feed::FeedSettings;
use crate::hooks::CacheInvalidator;
use crate::media::ImageArchive;
use crate::security::{is_authorized, API_KEY_HEADER};
use crate::store::BlogStore;
use crate::templates::TemplateEngine;
use anyhow::Result;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub blog: Arc<Blog>,
    pub cache: Arc<dyn RenderCache>,
    pub archive: ImageArchive,
    pub feed: Arc<FeedSettings>,
    pub admin_api_key: Option<Arc<str>>,
}

impl AppState {
    /// Wire the blog service, render cache and media archive over `store`.
    pub fn new(config: &Config, store: Arc<dyn BlogStore>) -> Result<Self> {
        let templates = TemplateEngine::new(config.template_dir.as_deref().map(Path::new))?;
        let cache: Arc<dyn RenderCache> =
            Arc::new(MokaRenderCache::new(config.render_cache_capacity));

        let blog = Blog::new(
            store,
            templates,
            BlogSettings {
                site_domain: config.site_domain.clone(),
                i18n_enabled: config.i18n_enabled,
            },
        )
        .with_listener(Arc::new(CacheInvalidator::new(cache.clone())));

        Ok(Self {
            blog: Arc::new(blog),
            cache,
            archive: ImageArchive::new(&config.media_url)?,
            feed: Arc::new(FeedSettings {
                title: config.blog_title.clone(),
                description: config.blog_description.clone(),
                link: config.blog_feed_link.clone(),
                items_to_display: config.blog_feed_items,
            }),
            admin_api_key: config.admin_api_key.as_deref().map(Arc::from),
        })
    }
}

/// Rejects admin requests without the configured API key.
async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if !is_authorized(state.admin_api_key.as_deref(), provided) {
        debug!(path = %request.uri().path(), "rejected admin request");
        return BlogError::Unauthorized.into_response();
    }
    next.run(request).await
}

pub fn router(state: AppState) -> Router {
    let admin = admin::router(state.blog.settings().i18n_enabled).route_layer(
        middleware::from_fn_with_state(state.clone(), require_api_key),
    );

    Router::new()
        .merge(public::router())
        .nest("/admin/blog", admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
