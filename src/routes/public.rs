use super::AppState;
use crate::api::{CategoryResource, PostResource};
use crate::error::{BlogError, BlogResult};
use crate::feed::PostFeed;
use crate::i18n::Language;
use crate::store::PostQuery;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

const JSON_CONTENT_TYPE: &str = "application/json";
const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/blog/posts", get(list_posts))
        .route("/api/blog/posts/:slug", get(get_post))
        .route("/api/blog/categories", get(list_categories))
        .route("/public/blog/feed/", get(feed))
}

#[derive(Debug, Default, Deserialize)]
struct LangParams {
    lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    lang: Option<String>,
    category: Option<i64>,
    tag: Option<i64>,
    limit: Option<usize>,
}

/// Unknown or disabled languages have no content.
fn language(code: Option<&str>) -> BlogResult<Language> {
    match code.filter(|c| !c.is_empty()) {
        None => Ok(Language::canonical()),
        Some(code) => Language::from_code(code).map_err(|_| BlogError::NotFound("language")),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> BlogResult<Json<Vec<PostResource>>> {
    let lang = language(params.lang.as_deref())?;
    let mut query = PostQuery::public(lang, Utc::now());
    query.category_id = params.category;
    query.tag_id = params.tag;
    query.limit = params.limit;

    let posts = state.blog.list_posts(&query).await?;
    let mut resources = Vec::with_capacity(posts.len());
    for post in &posts {
        resources.push(
            PostResource::build(
                state.blog.store(),
                &state.archive,
                &state.blog.settings().site_domain,
                post,
            )
            .await?,
        );
    }
    Ok(Json(resources))
}

/// A post in one language, served from the render cache when possible.
async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<LangParams>,
) -> BlogResult<Response> {
    let lang = language(params.lang.as_deref())?;

    let body = match state.cache.get(&slug, lang).await {
        Some(cached) => {
            debug!(slug = %slug, lang = %lang, "render cache hit");
            cached
        }
        None => {
            let post = state.blog.post_for_language(&slug, lang).await?;
            if !post.is_public(Utc::now()) {
                return Err(BlogError::NotFound("post"));
            }
            let resource = PostResource::build(
                state.blog.store(),
                &state.archive,
                &state.blog.settings().site_domain,
                &post,
            )
            .await?;
            let rendered = serde_json::to_string(&resource).map_err(anyhow::Error::from)?;
            state.cache.insert(&slug, lang, rendered.clone()).await;
            rendered
        }
    };

    Ok(([(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response())
}

async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<LangParams>,
) -> BlogResult<Json<Vec<CategoryResource>>> {
    let lang = language(params.lang.as_deref())?;
    let categories = state.blog.store().list_categories().await?;
    Ok(Json(
        categories
            .iter()
            .map(|c| CategoryResource::new(c, lang))
            .collect(),
    ))
}

async fn feed(State(state): State<AppState>) -> BlogResult<Response> {
    let xml = PostFeed::new(&state.blog, &state.archive, &state.feed)
        .render(Utc::now())
        .await?;
    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml).into_response())
}
