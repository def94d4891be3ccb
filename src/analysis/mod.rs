pub mod extractor;
pub mod patterns;
pub mod text;
