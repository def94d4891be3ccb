use std::collections::HashMap;
use std::sync::{Arc, Weak};
use crossbeam::channel::Sender;
use parking_lot::RwLock;
use crate::index::identity::RecordIdentity;
use crate::index::record::{Eviction, Record};

/// Outcome of retiring an identity after its record was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retirement {
    /// Entry removed (or already absent); the released payload should be persisted
    Removed,
    /// A newer live record owns the identity; it will be persisted on its own release
    Superseded,
}

/// Weakly-held records keyed by identity. An entry is only as alive as the
/// strongest external owner of its record.
pub struct DocumentCache {
    entries: RwLock<HashMap<RecordIdentity, Weak<Record>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        DocumentCache {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cache `record`, replacing any entry for the same identity
    pub fn insert(&self, record: &Arc<Record>, evictions: &Sender<Eviction>) {
        record.attach_write_back(evictions);
        self.entries
            .write()
            .insert(record.identity().clone(), Arc::downgrade(record));
    }

    pub fn get(&self, identity: &RecordIdentity) -> Option<Arc<Record>> {
        self.entries.read().get(identity).and_then(Weak::upgrade)
    }

    /// Live records at this instant
    pub fn snapshot(&self) -> Vec<Arc<Record>> {
        self.entries
            .read()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub fn retire(&self, identity: &RecordIdentity) -> Retirement {
        let mut entries = self.entries.write();
        match entries.get(identity) {
            Some(weak) if weak.strong_count() > 0 => Retirement::Superseded,
            Some(_) => {
                entries.remove(identity);
                Retirement::Removed
            }
            None => Retirement::Removed,
        }
    }

    /// Forget every cached record matching `predicate` and stop them from
    /// being written back. Returns how many live records were detached.
    pub fn disown_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&RecordIdentity) -> bool,
    {
        let detached: Vec<Arc<Record>> = {
            let mut entries = self.entries.write();
            let matching: Vec<RecordIdentity> = entries.keys().filter(|id| predicate(id)).cloned().collect();
            matching
                .iter()
                .filter_map(|id| entries.remove(id))
                .filter_map(|weak| weak.upgrade())
                .collect()
        };
        for record in &detached {
            record.disown();
        }
        detached.len()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        DocumentCache::new()
    }
}
