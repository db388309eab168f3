pub mod types;

use std::path::Path;

use crate::error::{CatalogError, Result};
use types::Config;

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        CatalogError::Config(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    let config: Config = serde_yml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    url::Url::parse(&config.scraper.base_url).map_err(|e| {
        CatalogError::Config(format!(
            "scraper.base_url {:?} is not a URL: {e}",
            config.scraper.base_url
        ))
    })?;
    if config.parser.text_window_chars == 0 {
        return Err(CatalogError::Config(
            "parser.text_window_chars must be positive".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn load_config_missing_file_returns_defaults() {
        let config =
            load_config(Path::new("/tmp/nonexistent_house_catalog_config_12345.yaml")).unwrap();
        assert_eq!(config.parser.contractor_id, 9465);
    }

    #[test]
    fn load_config_valid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "scraper:\n  max_retries: 5\n  base_url: \"https://example.com\"\n\
             parser:\n  skip_eligibility_check: true\n  contractor_names: [\"ООО Дом\"]\n\
             browser:\n  enabled: true"
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.scraper.max_retries, 5);
        assert_eq!(config.scraper.base_url, "https://example.com");
        assert!(config.parser.skip_eligibility_check);
        assert_eq!(config.parser.contractor_names, vec!["ООО Дом"]);
        assert!(config.browser.enabled);
        assert_eq!(config.browser.launch_timeout_secs, 12);
    }

    #[test]
    fn load_config_empty_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp).unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.batch.delay_ms, 2500);
        assert_eq!(config.cache.max_entries, 200);
    }

    #[test]
    fn load_config_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "{{{{invalid yaml: [[[").unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    #[test]
    fn load_config_rejects_bad_base_url() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "scraper:\n  base_url: \"not a url\"").unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
    }

    #[test]
    fn load_config_rejects_zero_window() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "parser:\n  text_window_chars: 0").unwrap();
        assert!(load_config(tmp.path()).is_err());
    }
}
