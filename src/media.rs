//! Image archive references: rendition URLs and byte sizes.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Renditions published for every archive image.
pub const RENDITIONS: &[&str] = &[
    "original",
    "large",
    "screen",
    "medium",
    "wallpaper",
    "thumb300y",
    "thumb350x",
    "banner1920",
];

/// Rendition used for feed enclosures.
pub const FEED_RENDITION: &str = "screen";

#[derive(Clone)]
pub struct ImageArchive {
    media_url: String,
    client: reqwest::Client,
}

impl ImageArchive {
    pub fn new(media_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            media_url: media_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `{media_url}/archives/images/{rendition}/{id}.jpg`
    pub fn url(&self, id: &str, rendition: &str) -> String {
        format!(
            "{}/archives/images/{}/{}.jpg",
            self.media_url, rendition, id
        )
    }

    /// Every rendition name mapped to its URL.
    pub fn urls(&self, id: &str) -> BTreeMap<&'static str, String> {
        RENDITIONS
            .iter()
            .map(|rendition| (*rendition, self.url(id, rendition)))
            .collect()
    }

    /// Byte size of a rendition, from a `HEAD` request to the media host.
    pub async fn size(&self, id: &str, rendition: &str) -> Result<u64> {
        let url = self.url(id, rendition);
        let response = self
            .client
            .head(&url)
            .send()
            .await
            .with_context(|| format!("HEAD {} failed", url))?;

        if !response.status().is_success() {
            anyhow::bail!("HEAD {} returned {}", url, response.status());
        }

        let size = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .with_context(|| format!("No Content-Length for {}", url))?;

        debug!(id, rendition, size, "Fetched rendition size");
        Ok(size)
    }
}
