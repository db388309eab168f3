use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse page: {reason}")]
    Parse { reason: String },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: u64 },

    #[error("Rate limit exceeded, try again later")]
    RateLimited,

    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Browser launch timed out after {timeout_secs}s")]
    BrowserLaunchTimeout { timeout_secs: u64 },

    #[error("Browser error: {reason}")]
    Browser { reason: String },

    #[error("Storage error: {reason}")]
    Storage { reason: String },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
