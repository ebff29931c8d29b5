use super::AppState;
use crate::admin::AdminSite;
use crate::error::{BlogResult, ValidationError};
use crate::i18n::Language;
use crate::models::{
    Author, AuthorInput, Category, CategoryInput, Post, PostInput, Tag, TagInput,
    TranslationInput,
};
use crate::store::PostQuery;
use crate::templates::TemplateDebug;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub(super) fn router(i18n_enabled: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/meta", get(meta))
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/:slug",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/:slug/rename", post(rename_post))
        .route("/posts/:slug/render-check", get(render_check))
        .route("/authors", get(list_authors).post(create_author))
        .route("/authors/:id", put(update_author).delete(delete_author))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/:id", put(update_tag).delete(delete_tag));

    if !i18n_enabled {
        return router;
    }
    router
        .route("/posts/:slug/translations", get(list_translations))
        .route("/posts/:slug/translation-draft", get(translation_draft))
        .route("/translations", post(create_translation))
        .route(
            "/translations/:slug",
            put(update_translation).delete(delete_translation),
        )
}

async fn meta(State(state): State<AppState>) -> Json<AdminSite> {
    Json(state.blog.admin().clone())
}

// ==================== Posts ====================

#[derive(Debug, Default, Deserialize)]
struct AdminListParams {
    lang: Option<String>,
    search: Option<String>,
    category: Option<i64>,
    tag: Option<i64>,
    published: Option<bool>,
    /// Only posts waiting for their release date
    #[serde(default)]
    staging: bool,
}

fn parse_language(code: &str) -> BlogResult<Language> {
    Language::from_code(code).map_err(|e| ValidationError::field("lang", e.to_string()).into())
}

async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<AdminListParams>,
) -> BlogResult<Json<Vec<Post>>> {
    let lang = params.lang.as_deref().map(parse_language).transpose()?;
    let mut query = if params.staging {
        PostQuery::staging(lang.unwrap_or_default(), Utc::now())
    } else {
        PostQuery {
            lang,
            published: params.published,
            ..Default::default()
        }
    };
    query.search = params.search;
    query.category_id = params.category;
    query.tag_id = params.tag;

    Ok(Json(state.blog.list_posts(&query).await?))
}

async fn get_post(State(state): State<AppState>, Path(slug): Path<String>) -> BlogResult<Json<Post>> {
    Ok(Json(state.blog.get_post(&slug).await?))
}

async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<PostInput>,
) -> BlogResult<(StatusCode, Json<Post>)> {
    let post = state.blog.create_post(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<PostInput>,
) -> BlogResult<Json<Post>> {
    Ok(Json(state.blog.update_post(&slug, input).await?))
}

async fn delete_post(State(state): State<AppState>, Path(slug): Path<String>) -> BlogResult<StatusCode> {
    state.blog.delete_post(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct RenameRequest {
    slug: String,
}

async fn rename_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<RenameRequest>,
) -> BlogResult<Json<Post>> {
    Ok(Json(state.blog.rename_post(&slug, &request.slug).await?))
}

#[derive(Serialize)]
struct RenderCheck {
    ok: bool,
    template_debug: Option<TemplateDebug>,
}

async fn render_check(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> BlogResult<Json<RenderCheck>> {
    let post = state.blog.get_post(&slug).await?;
    let template_debug = state.blog.test_render_errors(&post);
    Ok(Json(RenderCheck {
        ok: template_debug.is_none(),
        template_debug,
    }))
}

// ==================== Translations ====================

async fn list_translations(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> BlogResult<Json<Vec<Post>>> {
    Ok(Json(state.blog.translations_of(&slug).await?))
}

#[derive(Debug, Deserialize)]
struct DraftParams {
    lang: String,
}

async fn translation_draft(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<DraftParams>,
) -> BlogResult<Json<TranslationInput>> {
    let lang = parse_language(&params.lang)?;
    Ok(Json(state.blog.translation_draft(&slug, lang).await?))
}

async fn create_translation(
    State(state): State<AppState>,
    Json(input): Json<TranslationInput>,
) -> BlogResult<(StatusCode, Json<Post>)> {
    let post = state.blog.create_translation(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_translation(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<TranslationInput>,
) -> BlogResult<Json<Post>> {
    Ok(Json(state.blog.update_translation(&slug, input).await?))
}

async fn delete_translation(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> BlogResult<StatusCode> {
    state.blog.delete_translation(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Authors ====================

async fn list_authors(State(state): State<AppState>) -> BlogResult<Json<Vec<Author>>> {
    Ok(Json(state.blog.store().list_authors().await?))
}

async fn create_author(
    State(state): State<AppState>,
    Json(input): Json<AuthorInput>,
) -> BlogResult<(StatusCode, Json<Author>)> {
    let author = state.blog.create_author(input).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AuthorInput>,
) -> BlogResult<Json<Author>> {
    Ok(Json(state.blog.update_author(id, input).await?))
}

async fn delete_author(State(state): State<AppState>, Path(id): Path<i64>) -> BlogResult<StatusCode> {
    state.blog.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Categories ====================

async fn list_categories(State(state): State<AppState>) -> BlogResult<Json<Vec<Category>>> {
    Ok(Json(state.blog.store().list_categories().await?))
}

async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> BlogResult<(StatusCode, Json<Category>)> {
    let category = state.blog.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> BlogResult<Json<Category>> {
    Ok(Json(state.blog.update_category(id, input).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> BlogResult<StatusCode> {
    state.blog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Tags ====================

async fn list_tags(State(state): State<AppState>) -> BlogResult<Json<Vec<Tag>>> {
    Ok(Json(state.blog.store().list_tags().await?))
}

async fn create_tag(
    State(state): State<AppState>,
    Json(input): Json<TagInput>,
) -> BlogResult<(StatusCode, Json<Tag>)> {
    let tag = state.blog.create_tag(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TagInput>,
) -> BlogResult<Json<Tag>> {
    Ok(Json(state.blog.update_tag(id, input).await?))
}

async fn delete_tag(State(state): State<AppState>, Path(id): Path<i64>) -> BlogResult<StatusCode> {
    state.blog.delete_tag(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

