pub mod types;
pub mod translator;
pub mod cache;
pub mod history;
