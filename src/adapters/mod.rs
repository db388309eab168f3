pub mod batch;
pub mod browser;
pub mod cache;
pub mod images;
pub mod scraper;
pub mod store;
