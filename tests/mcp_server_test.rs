use std::sync::Arc;

use house_catalog::adapters::store::memory_store::MemoryProjectStore;
use house_catalog::domain::project::ProjectRecord;
use house_catalog::error::{CatalogError, Result};
use house_catalog::mcp::server::CatalogMcpServer;
use house_catalog::ports::image_fetcher::{FetchedImage, ImageFetcher};
use house_catalog::ports::project_source::ProjectSource;

use async_trait::async_trait;
use rmcp::ServerHandler;

/// A simple source for integration tests
struct IntegrationSource;

#[async_trait]
impl ProjectSource for IntegrationSource {
    async fn fetch_project(
        &self,
        project_id: u64,
        _skip_eligibility_check: bool,
    ) -> Result<Option<ProjectRecord>> {
        Ok(Some(ProjectRecord::new(
            project_id,
            format!("https://example.com/project/{project_id}"),
        )))
    }
}

struct ErrorSource;

#[async_trait]
impl ProjectSource for ErrorSource {
    async fn fetch_project(
        &self,
        _project_id: u64,
        _skip_eligibility_check: bool,
    ) -> Result<Option<ProjectRecord>> {
        Err(CatalogError::RateLimited)
    }
}

struct NoImages;

#[async_trait]
impl ImageFetcher for NoImages {
    async fn fetch_image(&self, _url: &str) -> Result<Option<FetchedImage>> {
        Ok(None)
    }
}

fn server(source: Arc<dyn ProjectSource>) -> CatalogMcpServer {
    CatalogMcpServer::new(
        source,
        Arc::new(MemoryProjectStore::new()),
        Arc::new(NoImages),
    )
}

#[test]
fn server_lists_catalog_tools() {
    let info = server(Arc::new(IntegrationSource)).get_info();
    let instructions = info.instructions.unwrap();
    assert!(instructions.contains("catalog_parse_project"));
    assert!(instructions.contains("catalog_parse_batch"));
    assert!(instructions.contains("catalog_extract_html"));
    assert!(instructions.contains("catalog_project_details"));
    assert!(instructions.contains("catalog_render_description"));
    assert!(instructions.contains("catalog_project_image"));
    assert!(instructions.contains("catalog://project/{id}"));
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.resources.is_some());
}

#[test]
fn server_creates_with_different_sources() {
    let _ok = server(Arc::new(IntegrationSource));
    let _failing = server(Arc::new(ErrorSource));
}
