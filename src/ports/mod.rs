pub mod image_fetcher;
pub mod page_cache;
pub mod project_source;
pub mod project_store;
