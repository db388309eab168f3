//! Image download adapters: direct HTTP, headless browser, and a composite
//! that falls back from the first to the second.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER};
use tracing::{debug, warn};
use url::Url;

use crate::adapters::browser::shared::SharedBrowser;
use crate::config::types::{BrowserConfig, ScraperConfig};
use crate::error::{CatalogError, Result};
use crate::ports::image_fetcher::{FetchedImage, ImageFetcher};

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// Parse an image URL; IDN hosts come out in punycode.
pub fn normalize_image_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CatalogError::InvalidParams {
            reason: format!("unsupported image URL scheme: {}", url.scheme()),
        });
    }
    Ok(url)
}

/// Plain HTTP download with the site's referer.
pub struct HttpImageFetcher {
    http: Client,
    referer: String,
}

impl HttpImageFetcher {
    pub fn new(
        scraper: &ScraperConfig,
        browser: &BrowserConfig,
    ) -> std::result::Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(&scraper.user_agent)
            .timeout(Duration::from_secs(scraper.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            referer: browser.referer.clone(),
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch_image(&self, url: &str) -> Result<Option<FetchedImage>> {
        let url = normalize_image_url(url)?;
        debug!(url = %url, "Fetching image");
        let response = self
            .http
            .get(url.as_str())
            .header(REFERER, &self.referer)
            .header(ACCEPT, IMAGE_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, %status, "image host refused direct download");
            return Ok(None);
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        if !content_type.starts_with("image/") {
            debug!(url = %url, content_type = %content_type, "image host answered with a non-image");
            return Ok(None);
        }
        let bytes = response.bytes().await?.to_vec();
        Ok(Some(FetchedImage {
            bytes,
            content_type,
        }))
    }
}

/// Download through the shared headless browser.
pub struct BrowserImageFetcher {
    browser: Arc<SharedBrowser>,
}

impl BrowserImageFetcher {
    pub fn new(browser: Arc<SharedBrowser>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl ImageFetcher for BrowserImageFetcher {
    async fn fetch_image(&self, url: &str) -> Result<Option<FetchedImage>> {
        let url = normalize_image_url(url)?;
        self.browser.fetch_image(url.as_str()).await
    }
}

/// Tries the primary fetcher and falls back when it errors or comes back
/// empty.
pub struct CompositeImageFetcher {
    primary: Box<dyn ImageFetcher>,
    fallback: Box<dyn ImageFetcher>,
}

impl CompositeImageFetcher {
    pub fn new(primary: Box<dyn ImageFetcher>, fallback: Box<dyn ImageFetcher>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ImageFetcher for CompositeImageFetcher {
    async fn fetch_image(&self, url: &str) -> Result<Option<FetchedImage>> {
        match self.primary.fetch_image(url).await {
            Ok(Some(image)) => return Ok(Some(image)),
            Ok(None) => debug!(url, "Direct image fetch empty, trying browser"),
            Err(e @ (CatalogError::InvalidParams { .. } | CatalogError::Url(_))) => return Err(e),
            Err(e) => warn!(error = %e, url, "Direct image fetch failed, trying browser"),
        }
        self.fallback.fetch_image(url).await
    }
}
