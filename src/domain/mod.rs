pub mod declension;
pub mod description;
pub mod project;
