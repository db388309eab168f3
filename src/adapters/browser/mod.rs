pub mod chrome;
pub mod shared;
