use serde::{Deserialize, Serialize};

use crate::adapters::scraper::project_parser::{
    DEFAULT_BASE_URL, DEFAULT_CONTRACTOR_ID, DEFAULT_CONTRACTOR_NAME, DEFAULT_TEXT_WINDOW_CHARS,
    ExtractOptions,
};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Config {
    /// Extraction options for the configured site and contractor.
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            skip_eligibility_check: self.parser.skip_eligibility_check,
            base_url: self.scraper.base_url.clone(),
            contractor_id: self.parser.contractor_id,
            contractor_names: self.parser.contractor_names.clone(),
            text_window_chars: self.parser.text_window_chars,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: f64,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            rate_limit_per_second: default_rate_limit(),
            request_timeout_secs: default_timeout(),
            max_retries: default_retries(),
            base_url: default_base_url(),
        }
    }
}

/// Which projects count as ours and how far the text fallbacks look.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserConfig {
    #[serde(default = "default_contractor_id")]
    pub contractor_id: u64,
    #[serde(default = "default_contractor_names")]
    pub contractor_names: Vec<String>,
    #[serde(default)]
    pub skip_eligibility_check: bool,
    #[serde(default = "default_text_window_chars")]
    pub text_window_chars: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            contractor_id: default_contractor_id(),
            contractor_names: default_contractor_names(),
            skip_eligibility_check: false,
            text_window_chars: default_text_window_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_page_ttl")]
    pub page_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            page_ttl_secs: default_page_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Pause between consecutive project fetches.
    #[serde(default = "default_batch_delay_ms")]
    pub delay_ms: u64,
    /// Random extra pause added on top of `delay_ms`, up to this many ms.
    #[serde(default = "default_batch_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_batch_delay_ms(),
            jitter_ms: default_batch_jitter_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_referer")]
    pub referer: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            launch_timeout_secs: default_launch_timeout(),
            navigation_timeout_secs: default_navigation_timeout(),
            referer: default_referer(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_timeout() -> u64 {
    20
}

fn default_retries() -> u32 {
    2
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_contractor_id() -> u64 {
    DEFAULT_CONTRACTOR_ID
}

fn default_contractor_names() -> Vec<String> {
    vec![DEFAULT_CONTRACTOR_NAME.into()]
}

fn default_text_window_chars() -> usize {
    DEFAULT_TEXT_WINDOW_CHARS
}

fn default_max_entries() -> usize {
    200
}

fn default_page_ttl() -> u64 {
    600
}

fn default_batch_delay_ms() -> u64 {
    2500
}

fn default_batch_jitter_ms() -> u64 {
    1500
}

fn default_launch_timeout() -> u64 {
    12
}

fn default_navigation_timeout() -> u64 {
    15
}

fn default_referer() -> String {
    "https://xn--80az8a.xn--d1aqf.xn--p1ai/".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.scraper.base_url, "https://строим.дом.рф");
        assert_eq!(config.scraper.max_retries, 2);
        assert_eq!(config.parser.contractor_id, 9465);
        assert_eq!(config.parser.text_window_chars, 4000);
        assert!(!config.parser.skip_eligibility_check);
        assert_eq!(config.batch.delay_ms, 2500);
        assert_eq!(config.browser.launch_timeout_secs, 12);
        assert_eq!(config.browser.navigation_timeout_secs, 15);
        assert!(!config.browser.enabled);
    }

    #[test]
    fn extract_options_follow_config() {
        let mut config = Config::default();
        config.parser.skip_eligibility_check = true;
        config.scraper.base_url = "https://example.com".into();
        let options = config.extract_options();
        assert!(options.skip_eligibility_check);
        assert_eq!(options.base_url, "https://example.com");
        assert_eq!(options.contractor_names, vec!["Юрова Любовь Владимировна"]);
    }

    #[test]
    fn default_config_matches_default_extract_options() {
        assert_eq!(Config::default().extract_options(), ExtractOptions::default());
    }

    #[test]
    fn config_serde_roundtrip() {
        let original = Config::default();
        let yaml = serde_yml::to_string(&original).unwrap();
        let restored: Config = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(restored.parser.contractor_id, original.parser.contractor_id);
        assert_eq!(restored.browser.referer, original.browser.referer);
        assert_eq!(restored.cache.page_ttl_secs, original.cache.page_ttl_secs);
    }

    #[test]
    fn config_deserialize_with_overrides() {
        let yaml = "parser:\n  contractor_id: 100\nbatch:\n  delay_ms: 10";
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.parser.contractor_id, 100);
        assert_eq!(config.batch.delay_ms, 10);
        assert_eq!(config.batch.jitter_ms, 1500);
        assert_eq!(config.parser.text_window_chars, 4000);
    }
}
