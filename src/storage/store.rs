use crate::core::error::Result;
use crate::index::identity::RecordIdentity;
use crate::query::translator::Constraint;

/// Queryable columns of one persisted essay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMetadata {
    pub id: u32,
    pub title: String,
    pub category: String,
    pub period_key: i64,
    pub question: String,
}

impl RowMetadata {
    pub fn from_identity(identity: &RecordIdentity) -> Self {
        RowMetadata {
            id: identity.id(),
            title: identity.title().to_string(),
            category: identity.category().display_name().to_string(),
            period_key: identity.period().key(),
            question: identity.question().to_string(),
        }
    }
}

/// A selected row. `payload` holds the encoded document bytes.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub metadata: RowMetadata,
    pub payload: Vec<u8>,
}

/// Durable storage for essays. Every method may block on I/O and must only be
/// called from worker threads.
pub trait Store: Send + Sync {
    /// Create the table and indexes if missing
    fn bootstrap(&self) -> Result<()>;

    /// Insert or replace by id. Without a payload only the metadata of an
    /// existing row is refreshed; returns false if there was no such row.
    fn upsert(&self, row: &RowMetadata, payload: Option<&[u8]>) -> Result<bool>;

    /// Returns the number of rows removed
    fn delete(&self, id: u32) -> Result<usize>;

    fn delete_matching(&self, constraint: &Constraint) -> Result<usize>;

    fn select(&self, constraint: &Constraint) -> Result<Vec<StoredRow>>;

    fn matching_ids(&self, constraint: &Constraint) -> Result<Vec<u32>>;
}
