//! The blog service: every write goes through here so that normalization,
//! validation, constraint mapping and save notifications always apply.

use crate::admin::{AdminSite, ModelAdmin};
use crate::error::{
    BlogError, BlogResult, Constraint, StoreError, ValidationError, ValidationErrors,
};
use crate::helpers::list_blog_categories;
use crate::hooks::{notify, SaveListener, SavedEntity};
use crate::i18n::Language;
use crate::models::{
    check_max_len, check_required, check_slug, Author, AuthorInput, Category, CategoryInput,
    Post, PostInput, Tag, TagInput, TranslationInput,
};
use crate::store::{BlogStore, PostQuery};
use crate::templates::{validate_template, TemplateDebug, TemplateEngine};
use crate::translation::{
    post_for_language, validate_unique, TranslationGuard, DUPLICATE_SLUG, DUPLICATE_TRANSLATION,
};
use chrono::Utc;
use std::sync::Arc;
use tera::Context;
use tracing::{debug, info};

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Clone)]
pub struct BlogSettings {
    pub site_domain: String,
    pub i18n_enabled: bool,
}

pub struct Blog {
    store: Arc<dyn BlogStore>,
    templates: TemplateEngine,
    listeners: Vec<Arc<dyn SaveListener>>,
    admin: AdminSite,
    settings: BlogSettings,
}

/// Turn storage constraint violations into editor-facing errors.
fn store_error(error: StoreError) -> BlogError {
    let message = match error {
        StoreError::Conflict(Constraint::PostSlug) => ValidationError::field("slug", DUPLICATE_SLUG),
        StoreError::Conflict(Constraint::SourceLanguage) => {
            ValidationError::field("lang", DUPLICATE_TRANSLATION)
        }
        StoreError::Conflict(Constraint::CategorySlug) => {
            ValidationError::field("slug", "Category with this Slug already exists.")
        }
        StoreError::Conflict(Constraint::TagSlug) => {
            ValidationError::field("slug", "Tag with this Slug already exists.")
        }
        StoreError::Conflict(Constraint::Reference) => {
            ValidationError::general("A referenced record does not exist or is still in use.")
        }
        other => return other.into(),
    };
    message.into()
}

/// Keep the validation errors of a result, propagate anything else.
fn collect(errors: &mut ValidationErrors, result: BlogResult<()>) -> BlogResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(BlogError::Validation(found)) => {
            errors.extend(found);
            Ok(())
        }
        Err(other) => Err(other),
    }
}

impl Blog {
    pub fn new(store: Arc<dyn BlogStore>, templates: TemplateEngine, settings: BlogSettings) -> Self {
        Self {
            store,
            templates,
            listeners: Vec::new(),
            admin: AdminSite::new(settings.i18n_enabled),
            settings,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn SaveListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn store(&self) -> &dyn BlogStore {
        self.store.as_ref()
    }

    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    pub fn admin(&self) -> &AdminSite {
        &self.admin
    }

    pub fn settings(&self) -> &BlogSettings {
        &self.settings
    }

    async fn saved(&self, entity: SavedEntity<'_>) {
        notify(&self.listeners, self.store.as_ref(), entity).await;
    }

    fn require_i18n(&self) -> BlogResult<()> {
        if self.settings.i18n_enabled {
            Ok(())
        } else {
            Err(BlogError::Disabled("translations"))
        }
    }

    // ==================== Validation ====================

    /// Field rules shared by posts and translations.
    async fn validate_post_fields(&self, post: &Post) -> BlogResult<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let c = &post.content;

        check_slug(&mut errors, "slug", &post.slug);
        check_required(&mut errors, "title", &c.title);
        check_max_len(&mut errors, "title", &c.title, 255);
        check_max_len(&mut errors, "subtitle", &c.subtitle, 255);
        check_required(&mut errors, "lede", &c.lede);
        check_required(&mut errors, "body", &c.body);
        if let Err(e) = validate_template(&c.body) {
            errors.push(ValidationError::field("body", e.message));
        }
        match &post.banner {
            None => errors.push(ValidationError::field("banner", crate::models::REQUIRED)),
            Some(banner) => check_max_len(&mut errors, "banner", banner, 50),
        }

        match post.category_id {
            None => errors.push(ValidationError::field("category", crate::models::REQUIRED)),
            Some(id) => {
                if self.store.get_category(id).await?.is_none() {
                    errors.push(ValidationError::field("category", INVALID_CHOICE));
                }
            }
        }

        for description in &post.authors {
            if self.store.get_author(description.author_id).await?.is_none() {
                errors.push(ValidationError::field("authors", INVALID_CHOICE));
            }
            check_max_len(&mut errors, "authors", &description.description, 100);
        }
        for tag in &post.tags {
            if self.store.get_tag(*tag).await?.is_none() {
                errors.push(ValidationError::field("tags", INVALID_CHOICE));
            }
        }

        Ok(errors)
    }

    /// The source must be an existing canonical post in another language.
    /// The language comparison is skipped when `lang` did not parse.
    async fn validate_translation_source(
        &self,
        post: &Post,
        lang_valid: bool,
    ) -> BlogResult<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let Some(source_slug) = post.source.as_deref() else {
            return Ok(errors);
        };
        match self.store.get_post(source_slug).await? {
            Some(source) if !source.is_translation() => {
                if lang_valid && source.lang == post.lang {
                    errors.push(ValidationError::field(
                        "lang",
                        "Translation language must differ from the source language.",
                    ));
                }
            }
            _ => errors.push(ValidationError::field("source", INVALID_CHOICE)),
        }
        Ok(errors)
    }

    // ==================== Posts ====================

    pub async fn create_post(&self, input: PostInput) -> BlogResult<Post> {
        let mut post = input.into_post(Language::canonical(), None, Utc::now());
        post.normalize_body();
        post.clean_html_fields();

        let mut errors = self.validate_post_fields(&post).await?;
        collect(&mut errors, validate_unique(self.store(), &post, true).await)?;
        errors.into_result()?;

        self.store.insert_post(&post).await.map_err(store_error)?;
        info!(slug = %post.slug, "Created post");
        self.saved(SavedEntity::Post(&post)).await;
        Ok(post)
    }

    /// Edit a canonical post. A changed slug renames the post first.
    pub async fn update_post(&self, slug: &str, input: PostInput) -> BlogResult<Post> {
        let existing = self
            .store
            .get_post(slug)
            .await?
            .filter(|p| !p.is_translation())
            .ok_or(BlogError::NotFound("post"))?;

        let admin = ModelAdmin::POST;
        let readonly = admin.readonly_fields(false);
        let mut post = input.merge_into(&existing, &readonly, Utc::now());
        post.normalize_body();
        post.clean_html_fields();

        if post.slug.is_empty() || !admin.capabilities.can_rename() {
            post.slug = existing.slug.clone();
        }
        let renamed = post.slug != existing.slug;

        let mut errors = self.validate_post_fields(&post).await?;
        if renamed {
            collect(&mut errors, validate_unique(self.store(), &post, true).await)?;
        }
        errors.into_result()?;

        self.store
            .update_post(&existing.slug, &post)
            .await
            .map_err(store_error)?;
        if renamed {
            info!(from = %existing.slug, to = %post.slug, "Renamed post");
            self.saved(SavedEntity::PostRemoved {
                canonical_slug: &existing.slug,
            })
            .await;
        } else {
            debug!(slug = %post.slug, "Updated post");
        }

        if admin.capabilities.sync_to_translation {
            self.sync_to_translations(&post).await?;
        }
        self.saved(SavedEntity::Post(&post)).await;
        Ok(post)
    }

    /// Copy shared, non-excluded fields of a source to its translations.
    async fn sync_to_translations(&self, source: &Post) -> BlogResult<()> {
        for mut translation in self.store.translations_of(&source.slug).await? {
            if translation.release_date == source.release_date {
                continue;
            }
            translation.release_date = source.release_date;
            self.store
                .update_post(&translation.slug, &translation)
                .await
                .map_err(store_error)?;
            debug!(slug = %translation.slug, "Synced release date to translation");
        }
        Ok(())
    }

    pub async fn delete_post(&self, slug: &str) -> BlogResult<()> {
        let existing = self
            .store
            .get_post(slug)
            .await?
            .filter(|p| !p.is_translation())
            .ok_or(BlogError::NotFound("post"))?;

        match self.store.delete_post(slug).await {
            Ok(true) => {}
            Ok(false) => return Err(BlogError::NotFound("post")),
            Err(StoreError::Conflict(Constraint::Reference)) => {
                return Err(ValidationError::general(
                    "Cannot delete a post that still has translations.",
                )
                .into());
            }
            Err(e) => return Err(store_error(e)),
        }

        info!(slug = %slug, "Deleted post");
        self.saved(SavedEntity::PostRemoved {
            canonical_slug: existing.canonical_slug(),
        })
        .await;
        Ok(())
    }

    pub async fn rename_post(&self, old_slug: &str, new_slug: &str) -> BlogResult<Post> {
        let existing = self
            .store
            .get_post(old_slug)
            .await?
            .filter(|p| !p.is_translation())
            .ok_or(BlogError::NotFound("post"))?;
        let input = PostInput {
            slug: new_slug.to_string(),
            ..PostInput::from_post(&existing)
        };
        self.update_post(old_slug, input).await
    }

    // ==================== Translations ====================

    pub async fn create_translation(&self, input: TranslationInput) -> BlogResult<Post> {
        self.require_i18n()?;

        let mut errors = ValidationErrors::new();
        let lang = match Language::from_code(input.lang.trim()) {
            Ok(lang) => lang,
            Err(_) => {
                errors.push(ValidationError::field("lang", INVALID_CHOICE));
                Language::canonical()
            }
        };
        let lang_valid = errors.is_empty();
        let source = input.source.filter(|s| !s.trim().is_empty());

        let mut post = input.post.into_post(lang, source, Utc::now());
        post.normalize_body();
        post.clean_html_fields();

        // A missing source is reported on its own
        let guard = TranslationGuard::new(self.store());
        if post.source.is_none() {
            guard.validate(&post, true).await?;
        }

        // Release date follows the source
        if let Some(source) = self.store.get_post(post.canonical_slug()).await? {
            post.release_date = source.release_date;
        }

        errors.extend(self.validate_translation_source(&post, lang_valid).await?);
        errors.extend(self.validate_post_fields(&post).await?);
        collect(&mut errors, guard.validate(&post, true).await)?;
        errors.into_result()?;

        self.store.insert_post(&post).await.map_err(store_error)?;
        info!(slug = %post.slug, lang = %post.lang, "Created translation");
        self.saved(SavedEntity::Post(&post)).await;
        Ok(post)
    }

    /// Edit a translation. Its slug and release date cannot change.
    pub async fn update_translation(&self, slug: &str, input: TranslationInput) -> BlogResult<Post> {
        self.require_i18n()?;

        let existing = self
            .store
            .get_post(slug)
            .await?
            .filter(Post::is_translation)
            .ok_or(BlogError::NotFound("translation"))?;

        let mut errors = ValidationErrors::new();
        let lang = if input.lang.trim().is_empty() {
            existing.lang
        } else {
            match Language::from_code(input.lang.trim()) {
                Ok(lang) => lang,
                Err(_) => {
                    errors.push(ValidationError::field("lang", INVALID_CHOICE));
                    existing.lang
                }
            }
        };
        let lang_valid = errors.is_empty();
        let source = input
            .source
            .filter(|s| !s.trim().is_empty())
            .or_else(|| existing.source.clone());

        let readonly = ModelAdmin::TRANSLATION.readonly_fields(false);
        let mut post = input.post.merge_into(&existing, &readonly, Utc::now());
        post.lang = lang;
        post.source = source;
        post.normalize_body();
        post.clean_html_fields();

        errors.extend(self.validate_translation_source(&post, lang_valid).await?);
        errors.extend(self.validate_post_fields(&post).await?);
        collect(
            &mut errors,
            TranslationGuard::new(self.store()).validate(&post, false).await,
        )?;
        errors.into_result()?;

        self.store
            .update_post(&existing.slug, &post)
            .await
            .map_err(store_error)?;
        debug!(slug = %post.slug, "Updated translation");
        if existing.source != post.source {
            self.saved(SavedEntity::PostRemoved {
                canonical_slug: existing.canonical_slug(),
            })
            .await;
        }
        self.saved(SavedEntity::Post(&post)).await;
        Ok(post)
    }

    pub async fn delete_translation(&self, slug: &str) -> BlogResult<()> {
        self.require_i18n()?;

        let existing = self
            .store
            .get_post(slug)
            .await?
            .filter(Post::is_translation)
            .ok_or(BlogError::NotFound("translation"))?;

        if !self.store.delete_post(slug).await.map_err(store_error)? {
            return Err(BlogError::NotFound("translation"));
        }
        info!(slug = %slug, "Deleted translation");
        self.saved(SavedEntity::PostRemoved {
            canonical_slug: existing.canonical_slug(),
        })
        .await;
        Ok(())
    }

    /// A new translation prefilled from its source.
    pub async fn translation_draft(
        &self,
        source_slug: &str,
        lang: Language,
    ) -> BlogResult<TranslationInput> {
        self.require_i18n()?;
        if !ModelAdmin::TRANSLATION.capabilities.translation_duplication {
            return Err(BlogError::Disabled("translation duplication"));
        }

        let source = self
            .store
            .get_post(source_slug)
            .await?
            .filter(|p| !p.is_translation())
            .ok_or(BlogError::NotFound("post"))?;

        let mut post = PostInput::from_post(&source);
        post.slug = format!("{}-{}", source.slug, lang.code());
        post.published = false;
        Ok(TranslationInput {
            source: Some(source.slug),
            lang: lang.code().to_string(),
            post,
        })
    }

    pub async fn translations_of(&self, source_slug: &str) -> BlogResult<Vec<Post>> {
        Ok(self.store.translations_of(source_slug).await?)
    }

    // ==================== Reads ====================

    /// The post in `lang`; a missing translation is a missing post.
    pub async fn post_for_language(&self, canonical_slug: &str, lang: Language) -> BlogResult<Post> {
        post_for_language(self.store(), canonical_slug, lang)
            .await?
            .ok_or(BlogError::NotFound("post"))
    }

    pub async fn get_post(&self, slug: &str) -> BlogResult<Post> {
        self.store
            .get_post(slug)
            .await?
            .ok_or(BlogError::NotFound("post"))
    }

    pub async fn list_posts(&self, query: &PostQuery) -> BlogResult<Vec<Post>> {
        Ok(self.store.list_posts(query).await?)
    }

    /// Published and released posts in `lang`, newest first.
    pub async fn published_posts(&self, lang: Language, limit: Option<usize>) -> BlogResult<Vec<Post>> {
        let mut query = PostQuery::public(lang, Utc::now());
        query.limit = limit;
        self.list_posts(&query).await
    }

    /// Published posts waiting for their release date.
    pub async fn staging_posts(&self, lang: Language) -> BlogResult<Vec<Post>> {
        self.list_posts(&PostQuery::staging(lang, Utc::now())).await
    }

    /// Render the body with the live helpers and report what went wrong.
    pub fn test_render_errors(&self, post: &Post) -> Option<TemplateDebug> {
        let mut context = Context::new();
        context.insert("post", post);
        self.templates.debug_render(&post.content.body, &context)
    }

    pub async fn render_categories(&self, lang: Language) -> BlogResult<String> {
        let categories = self.store.list_categories().await?;
        Ok(list_blog_categories(&self.templates, &categories, lang)?)
    }

    // ==================== Authors ====================

    pub async fn create_author(&self, input: AuthorInput) -> BlogResult<Author> {
        input.validate()?;
        let author = self.store.insert_author(&input).await.map_err(store_error)?;
        info!(id = author.id, "Created author");
        self.saved(SavedEntity::Author(&author)).await;
        Ok(author)
    }

    pub async fn update_author(&self, id: i64, input: AuthorInput) -> BlogResult<Author> {
        input.validate()?;
        let author = self
            .store
            .update_author(id, &input)
            .await
            .map_err(store_error)?;
        self.saved(SavedEntity::Author(&author)).await;
        Ok(author)
    }

    pub async fn delete_author(&self, id: i64) -> BlogResult<()> {
        // Collected first: the descriptions go away with the author
        let affected = self.store.posts_by_author(id).await?;
        if !self.store.delete_author(id).await.map_err(store_error)? {
            return Err(BlogError::NotFound("author"));
        }
        for post in &affected {
            self.saved(SavedEntity::Post(post)).await;
        }
        Ok(())
    }

    // ==================== Categories ====================

    pub async fn create_category(&self, input: CategoryInput) -> BlogResult<Category> {
        input.validate()?;
        let category = self
            .store
            .insert_category(&input)
            .await
            .map_err(store_error)?;
        info!(id = category.id, "Created category");
        self.saved(SavedEntity::Category(&category)).await;
        Ok(category)
    }

    pub async fn update_category(&self, id: i64, input: CategoryInput) -> BlogResult<Category> {
        input.validate()?;
        let category = self
            .store
            .update_category(id, &input)
            .await
            .map_err(store_error)?;
        self.saved(SavedEntity::Category(&category)).await;
        Ok(category)
    }

    pub async fn delete_category(&self, id: i64) -> BlogResult<()> {
        match self.store.delete_category(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(BlogError::NotFound("category")),
            Err(StoreError::Conflict(Constraint::Reference)) => Err(ValidationError::general(
                "Cannot delete a category that is used by posts.",
            )
            .into()),
            Err(e) => Err(store_error(e)),
        }
    }

    // ==================== Tags ====================

    pub async fn create_tag(&self, input: TagInput) -> BlogResult<Tag> {
        input.validate()?;
        let tag = self.store.insert_tag(&input).await.map_err(store_error)?;
        self.saved(SavedEntity::Tag(&tag)).await;
        Ok(tag)
    }

    pub async fn update_tag(&self, id: i64, input: TagInput) -> BlogResult<Tag> {
        input.validate()?;
        let tag = self
            .store
            .update_tag(id, &input)
            .await
            .map_err(store_error)?;
        self.saved(SavedEntity::Tag(&tag)).await;
        Ok(tag)
    }

    pub async fn delete_tag(&self, id: i64) -> BlogResult<()> {
        if !self.store.delete_tag(id).await.map_err(store_error)? {
            return Err(BlogError::NotFound("tag"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthorDescription, Localized, PostContent};
    use crate::store::MemoryStore;
    use crate::translation::MISSING_SOURCE;
    use chrono::{DateTime, Duration};

    struct Fixture {
        blog: Blog,
        category: Category,
        author: Author,
    }

    async fn fixture(i18n_enabled: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let blog = Blog::new(
            store,
            TemplateEngine::new(None).expect("engine"),
            BlogSettings {
                site_domain: "www.example.org".to_string(),
                i18n_enabled,
            },
        );
        let category = blog
            .create_category(CategoryInput {
                name: Localized::new("Astronomy"),
                slug: Localized::new("astronomy"),
                footer: Localized::default(),
            })
            .await
            .unwrap();
        let author = blog
            .create_author(AuthorInput {
                name: "Ada".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        Fixture {
            blog,
            category,
            author,
        }
    }

    fn input(f: &Fixture, slug: &str, release: Option<DateTime<Utc>>) -> PostInput {
        PostInput {
            slug: slug.to_string(),
            content: PostContent {
                title: format!("Title {}", slug),
                lede: "Lede".to_string(),
                body: "Body".to_string(),
                ..Default::default()
            },
            banner: Some("eso1907a".to_string()),
            category_id: Some(f.category.id),
            authors: vec![AuthorDescription {
                author_id: f.author.id,
                description: "Author:".to_string(),
            }],
            release_date: release,
            published: true,
            ..Default::default()
        }
    }

    fn translation(f: &Fixture, source: Option<&str>, lang: &str, slug: &str) -> TranslationInput {
        TranslationInput {
            source: source.map(str::to_string),
            lang: lang.to_string(),
            post: input(f, slug, None),
        }
    }

    fn validation<T: std::fmt::Debug>(result: BlogResult<T>) -> ValidationErrors {
        match result {
            Err(BlogError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    // ==================== Posts ====================

    #[tokio::test]
    async fn test_create_post_normalizes_body() {
        let f = fixture(true).await;
        let mut post = input(&f, "p", None);
        post.content.body = "one\u{a0}two\u{a0}three".to_string();

        let created = f.blog.create_post(post).await.unwrap();
        assert_eq!(created.content.body, "one two three");

        let stored = f.blog.get_post("p").await.unwrap();
        assert_eq!(stored.content.body, "one two three");
    }

    #[tokio::test]
    async fn test_create_post_required_fields() {
        let f = fixture(true).await;
        let errors = validation(
            f.blog
                .create_post(PostInput {
                    slug: "p".to_string(),
                    ..Default::default()
                })
                .await,
        );

        for field in ["title", "lede", "body", "banner", "category"] {
            assert_eq!(errors.for_field(field).len(), 1, "{}", field);
        }
    }

    #[tokio::test]
    async fn test_create_post_rejects_bad_template() {
        let f = fixture(true).await;
        let mut post = input(&f, "p", None);
        post.content.body = "{% if %}".to_string();

        let errors = validation(f.blog.create_post(post).await);
        let body = errors.for_field("body");
        assert_eq!(body.len(), 1);
        assert!(body[0].ends_with("is not a valid string format"));
    }

    #[tokio::test]
    async fn test_create_post_duplicate_slug() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();

        let errors = validation(f.blog.create_post(input(&f, "p", None)).await);
        assert_eq!(errors.for_field("slug"), vec![DUPLICATE_SLUG]);
    }

    #[tokio::test]
    async fn test_create_post_unknown_references() {
        let f = fixture(true).await;
        let mut post = input(&f, "p", None);
        post.category_id = Some(999);
        post.tags = vec![42];

        let errors = validation(f.blog.create_post(post).await);
        assert_eq!(errors.for_field("category"), vec![INVALID_CHOICE]);
        assert_eq!(errors.for_field("tags"), vec![INVALID_CHOICE]);
    }

    #[tokio::test]
    async fn test_update_keeps_created() {
        let f = fixture(true).await;
        let created = f.blog.create_post(input(&f, "p", None)).await.unwrap();

        let mut edit = input(&f, "p", None);
        edit.content.title = "Edited".to_string();
        let updated = f.blog.update_post("p", edit).await.unwrap();

        assert_eq!(updated.created, created.created);
        assert_eq!(updated.content.title, "Edited");
    }

    #[tokio::test]
    async fn test_update_with_new_slug_renames() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();
        f.blog
            .create_translation(translation(&f, Some("p"), "de", "p-de"))
            .await
            .unwrap();

        let renamed = f.blog.rename_post("p", "q").await.unwrap();
        assert_eq!(renamed.slug, "q");
        assert!(f.blog.get_post("p").await.is_err());

        let de = f.blog.get_post("p-de").await.unwrap();
        assert_eq!(de.source.as_deref(), Some("q"));
    }

    #[tokio::test]
    async fn test_rejected_rename_leaves_post_unchanged() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();

        let mut edit = input(&f, "q", None);
        edit.content.title = "Edited".to_string();
        edit.banner = Some("b".repeat(51));
        let errors = validation(f.blog.update_post("p", edit).await);
        assert_eq!(errors.for_field("banner").len(), 1);

        let stored = f.blog.get_post("p").await.unwrap();
        assert_eq!(stored.content.title, "Title p");
        assert!(f.blog.get_post("q").await.is_err());
    }

    #[tokio::test]
    async fn test_rich_text_cleaned_on_save() {
        let f = fixture(true).await;
        let mut post = input(&f, "p", None);
        post.content.body = "<p>Body</p><script>steal()</script>".to_string();
        post.content.links = r#"<a href="https://www.example.org" onclick="x()">site</a>"#.to_string();

        f.blog.create_post(post).await.unwrap();

        let stored = f.blog.get_post("p").await.unwrap();
        assert_eq!(stored.content.body, "<p>Body</p>");
        assert!(!stored.content.links.contains("onclick"));
        assert!(stored.content.links.contains("https://www.example.org"));
    }

    #[tokio::test]
    async fn test_release_date_synced_to_translations() {
        let f = fixture(true).await;
        let first = Utc::now() - Duration::days(2);
        f.blog.create_post(input(&f, "p", Some(first))).await.unwrap();
        let de = f
            .blog
            .create_translation(translation(&f, Some("p"), "de", "p-de"))
            .await
            .unwrap();
        assert_eq!(de.release_date, Some(first));

        let moved = Utc::now() - Duration::days(1);
        f.blog
            .update_post("p", input(&f, "p", Some(moved)))
            .await
            .unwrap();

        let de = f.blog.get_post("p-de").await.unwrap();
        assert_eq!(de.release_date, Some(moved));
    }

    #[tokio::test]
    async fn test_delete_source_with_translations_refused() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();
        f.blog
            .create_translation(translation(&f, Some("p"), "de", "p-de"))
            .await
            .unwrap();

        let errors = validation(f.blog.delete_post("p").await);
        assert_eq!(errors.general().len(), 1);

        f.blog.delete_translation("p-de").await.unwrap();
        f.blog.delete_post("p").await.unwrap();
    }

    // ==================== Translations ====================

    #[tokio::test]
    async fn test_translation_without_source() {
        let f = fixture(true).await;
        let mut bad = translation(&f, None, "xx", "");
        bad.post.content.title.clear();

        let errors = validation(f.blog.create_translation(bad).await);
        assert_eq!(errors.general(), vec![MISSING_SOURCE]);
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_translation_language() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();
        f.blog
            .create_translation(translation(&f, Some("p"), "de", "p-de"))
            .await
            .unwrap();

        let errors = validation(
            f.blog
                .create_translation(translation(&f, Some("p"), "de", "p-de-2"))
                .await,
        );
        assert_eq!(errors.for_field("lang"), vec![DUPLICATE_TRANSLATION]);
    }

    #[tokio::test]
    async fn test_resave_translation_skips_duplicate_check() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();
        f.blog
            .create_translation(translation(&f, Some("p"), "de", "p-de"))
            .await
            .unwrap();

        let mut edit = translation(&f, Some("p"), "de", "p-de");
        edit.post.content.title = "Neu".to_string();
        let saved = f.blog.update_translation("p-de", edit).await.unwrap();
        assert_eq!(saved.content.title, "Neu");
    }

    #[tokio::test]
    async fn test_translation_slug_locked() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();
        f.blog
            .create_translation(translation(&f, Some("p"), "de", "p-de"))
            .await
            .unwrap();

        let edit = translation(&f, Some("p"), "de", "something-else");
        let saved = f.blog.update_translation("p-de", edit).await.unwrap();
        assert_eq!(saved.slug, "p-de");
        assert!(f.blog.get_post("something-else").await.is_err());
    }

    #[tokio::test]
    async fn test_changing_language_onto_existing_translation() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();
        f.blog
            .create_translation(translation(&f, Some("p"), "de", "p-de"))
            .await
            .unwrap();
        f.blog
            .create_translation(translation(&f, Some("p"), "fr", "p-fr"))
            .await
            .unwrap();

        // Not caught by the guard on edit; the storage constraint catches it
        let errors = validation(
            f.blog
                .update_translation("p-fr", translation(&f, Some("p"), "de", "p-fr"))
                .await,
        );
        assert_eq!(errors.for_field("lang"), vec![DUPLICATE_TRANSLATION]);
    }

    #[tokio::test]
    async fn test_translation_in_source_language() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();

        let errors = validation(
            f.blog
                .create_translation(translation(&f, Some("p"), "en", "p-en"))
                .await,
        );
        assert_eq!(errors.for_field("lang").len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_translation_language_reported_once() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();

        let errors = validation(
            f.blog
                .create_translation(translation(&f, Some("p"), "xx", "p-xx"))
                .await,
        );
        assert_eq!(errors.for_field("lang"), vec![INVALID_CHOICE]);
    }

    #[tokio::test]
    async fn test_translations_disabled() {
        let f = fixture(false).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();

        let result = f
            .blog
            .create_translation(translation(&f, Some("p"), "de", "p-de"))
            .await;
        assert!(matches!(result, Err(BlogError::Disabled(_))));
    }

    #[tokio::test]
    async fn test_translation_draft() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();

        let draft = f.blog.translation_draft("p", Language::GERMAN).await.unwrap();
        assert_eq!(draft.source.as_deref(), Some("p"));
        assert_eq!(draft.lang, "de");
        assert_eq!(draft.post.slug, "p-de");
        assert_eq!(draft.post.content.title, "Title p");
        assert!(!draft.post.published);

        let created = f.blog.create_translation(draft).await.unwrap();
        assert!(created.is_translation());
    }

    #[tokio::test]
    async fn test_post_for_language_has_no_fallback() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();

        assert!(f.blog.post_for_language("p", Language::ENGLISH).await.is_ok());
        assert!(matches!(
            f.blog.post_for_language("p", Language::GERMAN).await,
            Err(BlogError::NotFound(_))
        ));
    }

    // ==================== Related Entities ====================

    #[tokio::test]
    async fn test_delete_used_category_refused() {
        let f = fixture(true).await;
        f.blog.create_post(input(&f, "p", None)).await.unwrap();

        let errors = validation(f.blog.delete_category(f.category.id).await);
        assert_eq!(errors.general().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_tag_slug() {
        let f = fixture(true).await;
        let tag = TagInput {
            name: "ALMA".to_string(),
            slug: "alma".to_string(),
        };
        f.blog.create_tag(tag.clone()).await.unwrap();

        let errors = validation(f.blog.create_tag(tag).await);
        assert_eq!(errors.for_field("slug").len(), 1);
    }

    #[tokio::test]
    async fn test_render_self_test() {
        let f = fixture(true).await;
        let mut post = f.blog.create_post(input(&f, "p", None)).await.unwrap();
        assert!(f.blog.test_render_errors(&post).is_none());

        post.content.body = "{{ dyk(text=post.title) }}".to_string();
        assert!(f.blog.test_render_errors(&post).is_none());

        post.content.body = "{{ nope() }}".to_string();
        assert!(f.blog.test_render_errors(&post).is_some());
    }
}
