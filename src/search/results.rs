use std::sync::Arc;
use crate::index::record::Record;

/// A matching record and the excerpts that matched in it
#[derive(Debug, Clone)]
pub struct ResultEntry {
    record: Arc<Record>,
    excerpts: Vec<String>,
}

impl ResultEntry {
    pub fn new(record: Arc<Record>, excerpts: &[String]) -> Self {
        ResultEntry {
            record,
            excerpts: excerpts.to_vec(),
        }
    }

    pub fn record(&self) -> &Arc<Record> {
        &self.record
    }

    /// Copy of the excerpts; changing it does not change the entry
    pub fn excerpts(&self) -> Vec<String> {
        self.excerpts.clone()
    }
}

/// Search results container
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub entries: Vec<ResultEntry>,
    pub took_ms: u64,
}

impl SearchResults {
    pub fn new(entries: Vec<ResultEntry>, took_ms: u64) -> Self {
        SearchResults { entries, took_ms }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.entries.iter().map(ResultEntry::record)
    }
}
