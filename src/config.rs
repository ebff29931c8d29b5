use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Server
    pub port: u16,
    pub site_domain: String,
    pub admin_api_key: Option<String>,

    // Media archive
    pub media_url: String,

    // Feed
    pub blog_title: String,
    pub blog_description: String,
    pub blog_feed_link: String,
    pub blog_feed_items: usize,

    // Translations
    pub i18n_enabled: bool,

    // Templates
    pub template_dir: Option<String>,

    // Render cache
    pub render_cache_capacity: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let site_domain = std::env::var("SITE_DOMAIN").context("SITE_DOMAIN not set")?;

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,

            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            media_url: std::env::var("MEDIA_URL")
                .unwrap_or_else(|_| format!("https://{}/media", site_domain)),
            site_domain,
            admin_api_key: std::env::var("ADMIN_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),

            blog_title: std::env::var("BLOG_TITLE").unwrap_or_else(|_| "Blog".to_string()),
            blog_description: std::env::var("BLOG_DESCRIPTION").unwrap_or_default(),
            blog_feed_link: std::env::var("BLOG_FEED_LINK")
                .unwrap_or_else(|_| "/public/blog/".to_string()),
            blog_feed_items: std::env::var("BLOG_FEED_ITEMS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            i18n_enabled: std::env::var("BLOG_I18N_ENABLED")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            template_dir: std::env::var("TEMPLATE_DIR").ok().filter(|d| !d.is_empty()),

            render_cache_capacity: std::env::var("RENDER_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
