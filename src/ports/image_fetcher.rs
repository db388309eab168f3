use async_trait::async_trait;

use crate::error::Result;

/// Downloaded image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// `Ok(None)` when the host answered but not with an image.
    async fn fetch_image(&self, url: &str) -> Result<Option<FetchedImage>>;
}
