use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::{debug, info, warn};

use crate::adapters::scraper::project_parser::{ExtractOptions, extract_project, project_url};
use crate::adapters::scraper::rate_limiter::RateLimiter;
use crate::config::types::{CacheConfig, ScraperConfig};
use crate::domain::project::ProjectRecord;
use crate::error::{CatalogError, Result};
use crate::ports::page_cache::PageCache;
use crate::ports::project_source::ProjectSource;

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const RU_LANGUAGE: &str = "ru-RU,ru;q=0.9,en;q=0.8";

/// Fetches project pages from the listing site and runs the extractor on them.
pub struct DomRfScraper {
    http: Client,
    rate_limiter: RateLimiter,
    cache: Arc<dyn PageCache>,
    config: ScraperConfig,
    cache_config: CacheConfig,
    options: ExtractOptions,
}

impl DomRfScraper {
    pub fn new(
        config: ScraperConfig,
        cache_config: CacheConfig,
        options: ExtractOptions,
        cache: Arc<dyn PageCache>,
    ) -> std::result::Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(RU_LANGUAGE));

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(true)
            .build()?;

        let rate_limiter = RateLimiter::new(config.rate_limit_per_second);

        Ok(Self {
            http,
            rate_limiter,
            cache,
            config,
            cache_config,
            options,
        })
    }

    fn page_url(&self, project_id: u64) -> String {
        project_url(&self.config.base_url, project_id)
    }

    /// Raw HTML of a project page, served from the cache when fresh.
    pub async fn fetch_page(&self, project_id: u64) -> Result<String> {
        let url = self.page_url(project_id);
        if let Some(html) = self.cache.get(&url) {
            debug!(project_id, "Cache hit for project page");
            return Ok(html);
        }

        let html = self.fetch_html(&url, project_id).await?;
        self.cache.set(
            &url,
            &html,
            Duration::from_secs(self.cache_config.page_ttl_secs),
        );
        Ok(html)
    }

    async fn fetch_html(&self, url: &str, project_id: u64) -> Result<String> {
        self.rate_limiter.wait().await;

        debug!(url, "Fetching page");

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(u64::from(attempt) * 2);
                debug!(attempt, delay_secs = delay.as_secs(), "Retrying request");
                tokio::time::sleep(delay).await;
                self.rate_limiter.wait().await;
            }

            match self.http.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().await.map_err(CatalogError::Http);
                    }
                    match status.as_u16() {
                        404 => return Err(CatalogError::ProjectNotFound { id: project_id }),
                        429 => {
                            warn!(project_id, "Rate limited by listing site (429)");
                            last_error = Some(CatalogError::RateLimited);
                        }
                        _ => {
                            warn!(project_id, %status, "Unexpected status for project page");
                            last_error = Some(CatalogError::Parse {
                                reason: format!("HTTP {status} for {url}"),
                            });
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt, "HTTP request failed");
                    last_error = Some(CatalogError::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CatalogError::Parse {
            reason: "all retries exhausted".into(),
        }))
    }
}

#[async_trait]
impl ProjectSource for DomRfScraper {
    async fn fetch_project(
        &self,
        project_id: u64,
        skip_eligibility_check: bool,
    ) -> Result<Option<ProjectRecord>> {
        let html = self.fetch_page(project_id).await?;
        let options = self
            .options
            .clone()
            .skipping_eligibility(skip_eligibility_check || self.options.skip_eligibility_check);
        let record = extract_project(&html, project_id, &options);
        if record.is_none() {
            info!(project_id, "Project page fetched but not eligible");
        }
        Ok(record)
    }

    fn invalidate(&self, project_id: u64) {
        self.cache.remove(&self.page_url(project_id));
    }
}
