use super::{BlogStore, PostQuery, StoreResult};
use crate::error::{Constraint, StoreError};
use crate::i18n::Language;
use crate::models::{
    Author, AuthorDescription, AuthorInput, Category, CategoryInput, Localized, Post,
    PostContent, Tag, TagInput,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder, Row, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

/// Tables for a fresh database. Constraint names are spelled out because
/// `map_db_error` translates them back into `Constraint` values.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS blog_author (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        biography TEXT NOT NULL DEFAULT '',
        photo_id VARCHAR(50),
        static_photo VARCHAR(200) NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS blog_author_translation (
        author_id BIGINT NOT NULL REFERENCES blog_author(id) ON DELETE CASCADE,
        lang VARCHAR(7) NOT NULL,
        biography TEXT NOT NULL,
        PRIMARY KEY (author_id, lang)
    )",
    "CREATE TABLE IF NOT EXISTS blog_category (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        slug VARCHAR(50) NOT NULL,
        footer TEXT NOT NULL DEFAULT '',
        CONSTRAINT blog_category_slug_key UNIQUE (slug)
    )",
    "CREATE TABLE IF NOT EXISTS blog_category_translation (
        category_id BIGINT NOT NULL REFERENCES blog_category(id) ON DELETE CASCADE,
        lang VARCHAR(7) NOT NULL,
        name VARCHAR(100),
        slug VARCHAR(50),
        footer TEXT,
        PRIMARY KEY (category_id, lang),
        CONSTRAINT blog_category_translation_slug_key UNIQUE (lang, slug)
    )",
    "CREATE TABLE IF NOT EXISTS blog_tag (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(50) NOT NULL,
        slug VARCHAR(50) NOT NULL,
        CONSTRAINT blog_tag_slug_key UNIQUE (slug)
    )",
    "CREATE TABLE IF NOT EXISTS blog_post (
        slug VARCHAR(50) NOT NULL,
        lang VARCHAR(7) NOT NULL,
        source_id VARCHAR(50),
        title VARCHAR(255) NOT NULL,
        subtitle VARCHAR(255) NOT NULL DEFAULT '',
        lede TEXT NOT NULL,
        body TEXT NOT NULL,
        discover_box TEXT NOT NULL DEFAULT '',
        numbers_box TEXT NOT NULL DEFAULT '',
        links TEXT NOT NULL DEFAULT '',
        banner_id VARCHAR(50),
        category_id BIGINT REFERENCES blog_category(id) ON DELETE RESTRICT,
        release_date TIMESTAMPTZ,
        created TIMESTAMPTZ NOT NULL,
        last_modified TIMESTAMPTZ NOT NULL,
        published BOOLEAN NOT NULL DEFAULT FALSE,
        CONSTRAINT blog_post_pkey PRIMARY KEY (slug),
        CONSTRAINT blog_post_source_id_fkey FOREIGN KEY (source_id)
            REFERENCES blog_post(slug) ON DELETE RESTRICT ON UPDATE CASCADE,
        CONSTRAINT blog_post_source_lang_key UNIQUE (source_id, lang)
    )",
    "CREATE TABLE IF NOT EXISTS blog_authordescription (
        id BIGSERIAL PRIMARY KEY,
        author_id BIGINT NOT NULL REFERENCES blog_author(id) ON DELETE CASCADE,
        post_id VARCHAR(50) NOT NULL,
        description VARCHAR(100) NOT NULL DEFAULT '',
        CONSTRAINT blog_authordescription_post_id_fkey FOREIGN KEY (post_id)
            REFERENCES blog_post(slug) ON DELETE CASCADE ON UPDATE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS blog_post_tags (
        id BIGSERIAL PRIMARY KEY,
        post_id VARCHAR(50) NOT NULL,
        tag_id BIGINT NOT NULL REFERENCES blog_tag(id) ON DELETE CASCADE,
        CONSTRAINT blog_post_tags_post_id_fkey FOREIGN KEY (post_id)
            REFERENCES blog_post(slug) ON DELETE CASCADE ON UPDATE CASCADE,
        CONSTRAINT blog_post_tags_post_id_tag_id_key UNIQUE (post_id, tag_id)
    )",
];

/// One-time move from an integer `blog_post.id` primary key to `slug`.
/// Every foreign key that pointed at `id` is re-pointed at the slug.
pub(crate) const SLUG_KEY_MIGRATION: &[&str] = &[
    // blog_authordescription.post_id
    "ALTER TABLE blog_authordescription ADD COLUMN post_slug VARCHAR(50)",
    "UPDATE blog_authordescription d SET post_slug = p.slug FROM blog_post p WHERE d.post_id = p.id",
    "ALTER TABLE blog_authordescription DROP COLUMN post_id",
    "ALTER TABLE blog_authordescription RENAME COLUMN post_slug TO post_id",
    // blog_post_tags.post_id
    "ALTER TABLE blog_post_tags ADD COLUMN post_slug VARCHAR(50)",
    "UPDATE blog_post_tags t SET post_slug = p.slug FROM blog_post p WHERE t.post_id = p.id",
    "ALTER TABLE blog_post_tags DROP COLUMN post_id",
    "ALTER TABLE blog_post_tags RENAME COLUMN post_slug TO post_id",
    // blog_post.source_id
    "ALTER TABLE blog_post ADD COLUMN source_slug VARCHAR(50)",
    "UPDATE blog_post t SET source_slug = s.slug FROM blog_post s WHERE t.source_id = s.id",
    "ALTER TABLE blog_post DROP COLUMN source_id",
    "ALTER TABLE blog_post RENAME COLUMN source_slug TO source_id",
    // New primary key and constraints
    "ALTER TABLE blog_post DROP COLUMN id CASCADE",
    "ALTER TABLE blog_post ADD CONSTRAINT blog_post_pkey PRIMARY KEY (slug)",
    "ALTER TABLE blog_post ADD CONSTRAINT blog_post_source_id_fkey FOREIGN KEY (source_id)
        REFERENCES blog_post(slug) ON DELETE RESTRICT ON UPDATE CASCADE",
    "ALTER TABLE blog_post ADD CONSTRAINT blog_post_source_lang_key UNIQUE (source_id, lang)",
    "ALTER TABLE blog_authordescription ALTER COLUMN post_id SET NOT NULL",
    "ALTER TABLE blog_authordescription ADD CONSTRAINT blog_authordescription_post_id_fkey
        FOREIGN KEY (post_id) REFERENCES blog_post(slug) ON DELETE CASCADE ON UPDATE CASCADE",
    "ALTER TABLE blog_post_tags ALTER COLUMN post_id SET NOT NULL",
    "ALTER TABLE blog_post_tags ADD CONSTRAINT blog_post_tags_post_id_fkey
        FOREIGN KEY (post_id) REFERENCES blog_post(slug) ON DELETE CASCADE ON UPDATE CASCADE",
    "ALTER TABLE blog_post_tags ADD CONSTRAINT blog_post_tags_post_id_tag_id_key
        UNIQUE (post_id, tag_id)",
];

const POST_COLUMNS: &str = "slug, lang, source_id, title, subtitle, lede, body, discover_box, \
     numbers_box, links, banner_id, category_id, release_date, created, last_modified, published";

#[derive(FromRow)]
struct PostRow {
    slug: String,
    lang: String,
    source_id: Option<String>,
    title: String,
    subtitle: String,
    lede: String,
    body: String,
    discover_box: String,
    numbers_box: String,
    links: String,
    banner_id: Option<String>,
    category_id: Option<i64>,
    release_date: Option<DateTime<Utc>>,
    created: DateTime<Utc>,
    last_modified: DateTime<Utc>,
    published: bool,
}

#[derive(FromRow)]
struct AuthorRow {
    id: i64,
    name: String,
    biography: String,
    photo_id: Option<String>,
    static_photo: String,
}

#[derive(FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    footer: String,
}

#[derive(FromRow)]
struct TagRow {
    id: i64,
    name: String,
    slug: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

/// Translate constraint violations into `StoreError::Conflict`.
fn map_db_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        let constraint = match db.constraint() {
            Some("blog_post_pkey") => Some(Constraint::PostSlug),
            Some("blog_post_source_lang_key") => Some(Constraint::SourceLanguage),
            Some("blog_category_slug_key") | Some("blog_category_translation_slug_key") => {
                Some(Constraint::CategorySlug)
            }
            Some("blog_tag_slug_key") => Some(Constraint::TagSlug),
            _ if db.is_foreign_key_violation() => Some(Constraint::Reference),
            _ => None,
        };
        if let Some(constraint) = constraint {
            return StoreError::Conflict(constraint);
        }
    }
    StoreError::Database(error)
}

fn decode_language(code: &str) -> StoreResult<Language> {
    Language::from_code(code).map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// PostgreSQL-backed `BlogStore`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create tables, running the slug-key migration first on databases
    /// that still use the integer primary key.
    pub async fn migrate(&self) -> Result<()> {
        if self.needs_slug_key_migration().await? {
            info!("Migrating blog_post primary key to slug");
            self.run_slug_key_migration().await?;
        }

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to create blog tables")?;
        }
        Ok(())
    }

    async fn needs_slug_key_migration(&self) -> Result<bool> {
        let has_id: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.columns
                WHERE table_name = 'blog_post' AND column_name = 'id'
            )",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to inspect blog_post columns")?;
        Ok(has_id)
    }

    async fn run_slug_key_migration(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in SLUG_KEY_MIGRATION {
            if let Err(e) = sqlx::query(statement).execute(&mut *tx).await {
                tx.rollback().await?;
                return Err(e).context("Migration failed and was rolled back");
            }
        }
        tx.commit().await?;
        Ok(())
    }

    // ==================== Row Assembly ====================

    /// Attach author descriptions and tags to post rows, keeping row order.
    async fn assemble_posts(&self, rows: Vec<PostRow>) -> StoreResult<Vec<Post>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let slugs: Vec<String> = rows.iter().map(|r| r.slug.clone()).collect();

        let mut authors: HashMap<String, Vec<AuthorDescription>> = HashMap::new();
        let description_rows = sqlx::query(
            "SELECT post_id, author_id, description FROM blog_authordescription
             WHERE post_id = ANY($1) ORDER BY id",
        )
        .bind(&slugs)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        for row in description_rows {
            authors
                .entry(row.try_get("post_id")?)
                .or_default()
                .push(AuthorDescription {
                    author_id: row.try_get("author_id")?,
                    description: row.try_get("description")?,
                });
        }

        let mut tags: HashMap<String, Vec<i64>> = HashMap::new();
        let tag_rows = sqlx::query(
            "SELECT post_id, tag_id FROM blog_post_tags WHERE post_id = ANY($1) ORDER BY id",
        )
        .bind(&slugs)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        for row in tag_rows {
            tags.entry(row.try_get("post_id")?)
                .or_default()
                .push(row.try_get("tag_id")?);
        }

        rows.into_iter()
            .map(|row| {
                Ok(Post {
                    lang: decode_language(&row.lang)?,
                    authors: authors.remove(&row.slug).unwrap_or_default(),
                    tags: tags.remove(&row.slug).unwrap_or_default(),
                    source: row.source_id,
                    content: PostContent {
                        title: row.title,
                        subtitle: row.subtitle,
                        lede: row.lede,
                        body: row.body,
                        discover_box: row.discover_box,
                        numbers_box: row.numbers_box,
                        links: row.links,
                    },
                    banner: row.banner_id,
                    category_id: row.category_id,
                    release_date: row.release_date,
                    created: row.created,
                    last_modified: row.last_modified,
                    published: row.published,
                    slug: row.slug,
                })
            })
            .collect()
    }

    async fn fetch_posts(&self, sql: &str, bind: &str) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        self.assemble_posts(rows).await
    }

    async fn fetch_posts_by_id(&self, sql: &str, id: i64) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        self.assemble_posts(rows).await
    }

    async fn write_relations(tx: &mut Transaction<'_, Postgres>, post: &Post) -> StoreResult<()> {
        sqlx::query("DELETE FROM blog_authordescription WHERE post_id = $1")
            .bind(&post.slug)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
        for description in &post.authors {
            sqlx::query(
                "INSERT INTO blog_authordescription (author_id, post_id, description)
                 VALUES ($1, $2, $3)",
            )
            .bind(description.author_id)
            .bind(&post.slug)
            .bind(&description.description)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
        }

        sqlx::query("DELETE FROM blog_post_tags WHERE post_id = $1")
            .bind(&post.slug)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
        for tag in &post.tags {
            sqlx::query("INSERT INTO blog_post_tags (post_id, tag_id) VALUES ($1, $2)")
                .bind(&post.slug)
                .bind(tag)
                .execute(&mut **tx)
                .await
                .map_err(map_db_error)?;
        }
        Ok(())
    }

    async fn author_translations(&self, ids: &[i64]) -> StoreResult<HashMap<i64, Localized>> {
        let rows = sqlx::query(
            "SELECT author_id, lang, biography FROM blog_author_translation
             WHERE author_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut map: HashMap<i64, Localized> = HashMap::new();
        for row in rows {
            let code: String = row.try_get("lang")?;
            let Ok(lang) = Language::from_code(&code) else {
                warn!(lang = %code, "Skipping author translation in unknown language");
                continue;
            };
            map.entry(row.try_get("author_id")?)
                .or_default()
                .translations
                .insert(lang, row.try_get("biography")?);
        }
        Ok(map)
    }

    async fn assemble_authors(&self, rows: Vec<AuthorRow>) -> StoreResult<Vec<Author>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut translations = self.author_translations(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut biography = translations.remove(&row.id).unwrap_or_default();
                biography.default = row.biography;
                Author {
                    id: row.id,
                    name: row.name,
                    biography,
                    photo: row.photo_id,
                    static_photo: row.static_photo,
                }
            })
            .collect())
    }

    async fn write_author_translations(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        input: &AuthorInput,
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM blog_author_translation WHERE author_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
        for (lang, biography) in &input.biography.translations {
            if biography.is_empty() {
                continue;
            }
            sqlx::query(
                "INSERT INTO blog_author_translation (author_id, lang, biography)
                 VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(lang.code())
            .bind(biography)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
        }
        Ok(())
    }

    async fn assemble_categories(&self, rows: Vec<CategoryRow>) -> StoreResult<Vec<Category>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let translation_rows = sqlx::query(
            "SELECT category_id, lang, name, slug, footer FROM blog_category_translation
             WHERE category_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut fields: HashMap<i64, (Localized, Localized, Localized)> = HashMap::new();
        for row in translation_rows {
            let code: String = row.try_get("lang")?;
            let Ok(lang) = Language::from_code(&code) else {
                warn!(lang = %code, "Skipping category translation in unknown language");
                continue;
            };
            let entry = fields.entry(row.try_get("category_id")?).or_default();
            let columns: [(&str, &mut Localized); 3] = [
                ("name", &mut entry.0),
                ("slug", &mut entry.1),
                ("footer", &mut entry.2),
            ];
            for (column, localized) in columns {
                if let Some(value) = row.try_get::<Option<String>, _>(column)? {
                    localized.translations.insert(lang, value);
                }
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let (mut name, mut slug, mut footer) = fields.remove(&row.id).unwrap_or_default();
                name.default = row.name;
                slug.default = row.slug;
                footer.default = row.footer;
                Category {
                    id: row.id,
                    name,
                    slug,
                    footer,
                }
            })
            .collect())
    }

    async fn write_category_translations(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        input: &CategoryInput,
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM blog_category_translation WHERE category_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;

        let langs: BTreeSet<Language> = input
            .name
            .translations
            .keys()
            .chain(input.slug.translations.keys())
            .chain(input.footer.translations.keys())
            .copied()
            .collect();
        for lang in langs {
            sqlx::query(
                "INSERT INTO blog_category_translation (category_id, lang, name, slug, footer)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(lang.code())
            .bind(non_empty(input.name.translations.get(&lang)))
            .bind(non_empty(input.slug.translations.get(&lang)))
            .bind(non_empty(input.footer.translations.get(&lang)))
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlogStore for PgStore {
    async fn get_post(&self, slug: &str) -> StoreResult<Option<Post>> {
        let sql = format!("SELECT {} FROM blog_post WHERE slug = $1", POST_COLUMNS);
        Ok(self.fetch_posts(&sql, slug).await?.pop())
    }

    async fn find_translation(&self, source: &str, lang: Language) -> StoreResult<Option<Post>> {
        let sql = format!(
            "SELECT {} FROM blog_post WHERE source_id = $1 AND lang = $2",
            POST_COLUMNS
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(source)
            .bind(lang.code())
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(self.assemble_posts(rows).await?.pop())
    }

    async fn translations_of(&self, source: &str) -> StoreResult<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM blog_post WHERE source_id = $1 ORDER BY lang",
            POST_COLUMNS
        );
        self.fetch_posts(&sql, source).await
    }

    async fn list_posts(&self, query: &PostQuery) -> StoreResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(POST_COLUMNS).push(" FROM blog_post WHERE TRUE");

        if let Some(lang) = query.lang {
            qb.push(" AND lang = ").push_bind(lang.code());
        }
        if let Some(published) = query.published {
            qb.push(" AND published = ").push_bind(published);
        }
        if let Some(by) = query.released_by {
            qb.push(" AND release_date <= ").push_bind(by);
        }
        if let Some(after) = query.released_after {
            qb.push(" AND release_date > ").push_bind(after);
        }
        if let Some(category) = query.category_id {
            qb.push(" AND category_id = ").push_bind(category);
        }
        if let Some(tag) = query.tag_id {
            qb.push(" AND slug IN (SELECT post_id FROM blog_post_tags WHERE tag_id = ")
                .push_bind(tag)
                .push(")");
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            let escaped = search
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            qb.push(
                " AND concat_ws(' ', slug, title, subtitle, lede, body, links, \
                 discover_box, numbers_box) ILIKE ",
            )
            .push_bind(format!("%{}%", escaped));
        }
        qb.push(" ORDER BY release_date DESC NULLS LAST, slug");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        self.assemble_posts(rows).await
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        sqlx::query(&format!(
            "INSERT INTO blog_post ({}) VALUES
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            POST_COLUMNS
        ))
        .bind(&post.slug)
        .bind(post.lang.code())
        .bind(&post.source)
        .bind(&post.content.title)
        .bind(&post.content.subtitle)
        .bind(&post.content.lede)
        .bind(&post.content.body)
        .bind(&post.content.discover_box)
        .bind(&post.content.numbers_box)
        .bind(&post.content.links)
        .bind(&post.banner)
        .bind(post.category_id)
        .bind(post.release_date)
        .bind(post.created)
        .bind(post.last_modified)
        .bind(post.published)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        Self::write_relations(&mut tx, post).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn update_post(&self, slug: &str, post: &Post) -> StoreResult<()> {
        // Foreign keys are ON UPDATE CASCADE, so a changed slug re-points
        // translations, author descriptions and tag links in this statement.
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let result = sqlx::query(
            "UPDATE blog_post SET lang = $2, source_id = $3, title = $4, subtitle = $5,
                lede = $6, body = $7, discover_box = $8, numbers_box = $9, links = $10,
                banner_id = $11, category_id = $12, release_date = $13, created = $14,
                last_modified = $15, published = $16, slug = $17
             WHERE slug = $1",
        )
        .bind(slug)
        .bind(post.lang.code())
        .bind(&post.source)
        .bind(&post.content.title)
        .bind(&post.content.subtitle)
        .bind(&post.content.lede)
        .bind(&post.content.body)
        .bind(&post.content.discover_box)
        .bind(&post.content.numbers_box)
        .bind(&post.content.links)
        .bind(&post.banner)
        .bind(post.category_id)
        .bind(post.release_date)
        .bind(post.created)
        .bind(post.last_modified)
        .bind(post.published)
        .bind(&post.slug)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_error)?;
            return Err(StoreError::NotFound("post"));
        }

        Self::write_relations(&mut tx, post).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn delete_post(&self, slug: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blog_post WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn posts_by_author(&self, author_id: i64) -> StoreResult<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM blog_post WHERE slug IN
                (SELECT post_id FROM blog_authordescription WHERE author_id = $1)
             ORDER BY slug",
            POST_COLUMNS
        );
        self.fetch_posts_by_id(&sql, author_id).await
    }

    async fn posts_by_category(&self, category_id: i64) -> StoreResult<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM blog_post WHERE category_id = $1 ORDER BY slug",
            POST_COLUMNS
        );
        self.fetch_posts_by_id(&sql, category_id).await
    }

    // ==================== Authors ====================

    async fn get_author(&self, id: i64) -> StoreResult<Option<Author>> {
        let rows = sqlx::query_as::<_, AuthorRow>(
            "SELECT id, name, biography, photo_id, static_photo FROM blog_author WHERE id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(self.assemble_authors(rows).await?.pop())
    }

    async fn list_authors(&self) -> StoreResult<Vec<Author>> {
        let rows = sqlx::query_as::<_, AuthorRow>(
            "SELECT id, name, biography, photo_id, static_photo FROM blog_author ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        self.assemble_authors(rows).await
    }

    async fn insert_author(&self, input: &AuthorInput) -> StoreResult<Author> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO blog_author (name, biography, photo_id, static_photo)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.biography.default)
        .bind(input.photo.as_deref().filter(|p| !p.is_empty()))
        .bind(&input.static_photo)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
        Self::write_author_translations(&mut tx, id, input).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(input.clone().into_author(id))
    }

    async fn update_author(&self, id: i64, input: &AuthorInput) -> StoreResult<Author> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let result = sqlx::query(
            "UPDATE blog_author SET name = $2, biography = $3, photo_id = $4, static_photo = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.biography.default)
        .bind(input.photo.as_deref().filter(|p| !p.is_empty()))
        .bind(&input.static_photo)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_error)?;
            return Err(StoreError::NotFound("author"));
        }
        Self::write_author_translations(&mut tx, id, input).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(input.clone().into_author(id))
    }

    async fn delete_author(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blog_author WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Categories ====================

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, footer FROM blog_category WHERE id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(self.assemble_categories(rows).await?.pop())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, footer FROM blog_category ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        self.assemble_categories(rows).await
    }

    async fn insert_category(&self, input: &CategoryInput) -> StoreResult<Category> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO blog_category (name, slug, footer) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&input.name.default)
        .bind(&input.slug.default)
        .bind(&input.footer.default)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
        Self::write_category_translations(&mut tx, id, input).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(input.clone().into_category(id))
    }

    async fn update_category(&self, id: i64, input: &CategoryInput) -> StoreResult<Category> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let result =
            sqlx::query("UPDATE blog_category SET name = $2, slug = $3, footer = $4 WHERE id = $1")
                .bind(id)
                .bind(&input.name.default)
                .bind(&input.slug.default)
                .bind(&input.footer.default)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_error)?;
            return Err(StoreError::NotFound("category"));
        }
        Self::write_category_translations(&mut tx, id, input).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(input.clone().into_category(id))
    }

    async fn delete_category(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blog_category WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Tags ====================

    async fn get_tag(&self, id: i64) -> StoreResult<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>("SELECT id, name, slug FROM blog_tag WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Tag::from))
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let rows =
            sqlx::query_as::<_, TagRow>("SELECT id, name, slug FROM blog_tag ORDER BY name, id")
                .fetch_all(&self.pool)
                .await
                .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn insert_tag(&self, input: &TagInput) -> StoreResult<Tag> {
        let row = sqlx::query_as::<_, TagRow>(
            "INSERT INTO blog_tag (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(&input.name)
        .bind(&input.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.into())
    }

    async fn update_tag(&self, id: i64, input: &TagInput) -> StoreResult<Tag> {
        let row = sqlx::query_as::<_, TagRow>(
            "UPDATE blog_tag SET name = $2, slug = $3 WHERE id = $1 RETURNING id, name, slug",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        row.map(Tag::from).ok_or(StoreError::NotFound("tag"))
    }

    async fn delete_tag(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blog_tag WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These run without a database; they pin the persisted layout contract.

    #[test]
    fn test_schema_declares_source_lang_unique() {
        let post_table = SCHEMA
            .iter()
            .find(|s| s.contains("CREATE TABLE IF NOT EXISTS blog_post ("))
            .expect("blog_post table");
        assert!(post_table.contains("CONSTRAINT blog_post_source_lang_key UNIQUE (source_id, lang)"));
        assert!(post_table.contains("CONSTRAINT blog_post_pkey PRIMARY KEY (slug)"));
    }

    #[test]
    fn test_join_tables_cascade_with_post() {
        for table in ["blog_authordescription", "blog_post_tags"] {
            let ddl = SCHEMA
                .iter()
                .find(|s| s.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)))
                .expect("join table");
            assert!(ddl.contains("REFERENCES blog_post(slug) ON DELETE CASCADE ON UPDATE CASCADE"));
        }
    }

    #[test]
    fn test_slug_migration_repoints_every_foreign_key() {
        for (table, column) in [
            ("blog_post", "source_id"),
            ("blog_authordescription", "post_id"),
            ("blog_post_tags", "post_id"),
        ] {
            let repointed = SLUG_KEY_MIGRATION.iter().any(|s| {
                s.starts_with(&format!("UPDATE {}", table)) && s.contains(&format!(".{} = ", column))
            });
            assert!(repointed, "{}.{} is not re-pointed", table, column);
        }
        assert!(SLUG_KEY_MIGRATION
            .iter()
            .any(|s| s.contains("PRIMARY KEY (slug)")));
    }

    #[test]
    fn test_post_columns_match_row() {
        assert_eq!(POST_COLUMNS.split(',').count(), 16);
    }
}
