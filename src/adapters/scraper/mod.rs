pub mod client;
pub mod eligibility;
pub mod hydration;
pub mod images;
pub mod locators;
pub mod normalize;
pub mod project_parser;
pub mod rate_limiter;
pub mod scope;
