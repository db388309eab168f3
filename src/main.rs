use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use house_catalog::adapters::browser::chrome::ChromeLauncher;
use house_catalog::adapters::browser::shared::SharedBrowser;
use house_catalog::adapters::cache::memory_cache::MemoryPageCache;
use house_catalog::adapters::images::{
    BrowserImageFetcher, CompositeImageFetcher, HttpImageFetcher,
};
use house_catalog::adapters::scraper::client::DomRfScraper;
use house_catalog::adapters::store::memory_store::MemoryProjectStore;
use house_catalog::config::load_config;
use house_catalog::mcp::server::CatalogMcpServer;
use house_catalog::ports::image_fetcher::ImageFetcher;
use house_catalog::ports::page_cache::PageCache;

const BROWSER_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

fn find_config_path() -> PathBuf {
    let candidates = [PathBuf::from("config.yaml"), exe_dir().join("config.yaml")];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting house-catalog server");

    let config_path = find_config_path();
    let config = load_config(&config_path)?;
    let options = config.extract_options();

    let cache: Arc<dyn PageCache> = Arc::new(MemoryPageCache::new(config.cache.max_entries));
    let source = Arc::new(DomRfScraper::new(
        config.scraper.clone(),
        config.cache.clone(),
        options.clone(),
        cache,
    )?);
    let store = Arc::new(MemoryProjectStore::new());

    let direct = HttpImageFetcher::new(&config.scraper, &config.browser)?;
    let images: Arc<dyn ImageFetcher> = if config.browser.enabled {
        tracing::info!("Browser image fallback enabled");
        let browser = Arc::new(SharedBrowser::new(
            Arc::new(ChromeLauncher::new(BROWSER_IDLE_TIMEOUT)),
            &config.browser,
        ));
        Arc::new(CompositeImageFetcher::new(
            Box::new(direct),
            Box::new(BrowserImageFetcher::new(browser)),
        ))
    } else {
        tracing::info!("Browser image fallback disabled, using direct downloads only");
        Arc::new(direct)
    };

    let server = CatalogMcpServer::new(source, store, images)
        .with_extract_options(options)
        .with_batch_config(config.batch);

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
