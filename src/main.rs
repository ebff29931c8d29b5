use anyhow::{Context, Result};
use outreach_blog::config::Config;
use outreach_blog::routes::{self, AppState};
use outreach_blog::store::PgStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("outreach_blog=info".parse()?),
        )
        .init();

    info!("Starting blog service");

    let config = Config::from_env()?;

    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;
    info!("Database ready");

    let state = AppState::new(&config, Arc::new(store))?;
    info!(
        i18n = config.i18n_enabled,
        admin = config.admin_api_key.is_some(),
        "Blog service configured"
    );

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(%addr, "Server listening");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
