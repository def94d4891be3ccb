pub mod identity;
pub mod record;
pub mod document_cache;
pub mod write_back;
pub mod index_cache;
