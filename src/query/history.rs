use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use parking_lot::Mutex;
use tracing::debug;
use crate::core::error::Result;

pub const DEFAULT_HISTORY_SIZE: usize = 30;

#[derive(Default)]
struct HistoryState {
    entries: VecDeque<String>,
    // Occurrence counts mirroring `entries` for O(1) membership
    counts: HashMap<String, usize>,
}

impl HistoryState {
    fn push(&mut self, entry: String) {
        *self.counts.entry(entry.clone()).or_insert(0) += 1;
        self.entries.push_back(entry);
    }

    fn forget(&mut self, entry: &str) {
        if let Some(count) = self.counts.get_mut(entry) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(entry);
            }
        }
    }

    fn pop_front(&mut self) -> Option<String> {
        let entry = self.entries.pop_front()?;
        self.forget(&entry);
        Some(entry)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.counts.clear();
    }

    fn truncate(&mut self, max: usize) {
        while self.entries.len() > max {
            self.pop_front();
        }
    }
}

/// Recent search terms, oldest first. Entries are stored lowercase.
pub struct SearchHistory {
    state: Mutex<HistoryState>,
    max_size: usize,
}

impl SearchHistory {
    pub fn new(max_size: usize) -> Self {
        SearchHistory {
            state: Mutex::new(HistoryState::default()),
            max_size: max_size.max(1),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn add_entry(&self, entry: &str) {
        let mut state = self.state.lock();
        state.push(entry.to_lowercase());
        state.truncate(self.max_size);
    }

    /// Remove one occurrence; true if the history changed
    pub fn remove_entry(&self, entry: &str) -> bool {
        let entry = entry.to_lowercase();
        let mut state = self.state.lock();
        if !state.counts.contains_key(&entry) {
            return false;
        }
        if let Some(pos) = state.entries.iter().position(|e| *e == entry) {
            state.entries.remove(pos);
        }
        state.forget(&entry);
        true
    }

    pub fn remove_first_entry(&self) -> Option<String> {
        self.state.lock().pop_front()
    }

    pub fn last_entry(&self) -> Option<String> {
        self.state.lock().entries.back().cloned()
    }

    pub fn contains_entry(&self, entry: &str) -> bool {
        self.state.lock().counts.contains_key(&entry.to_lowercase())
    }

    pub fn entries(&self) -> Vec<String> {
        self.state.lock().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole history with `entries`
    pub fn replace_with<I, S>(&self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.state.lock();
        state.clear();
        for entry in entries {
            state.push(entry.as_ref().to_lowercase());
        }
        state.truncate(self.max_size);
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.entries();
        let json = serde_json::to_vec(&snapshot)?;
        fs::write(path, json)?;
        debug!(path = %path.display(), entries = snapshot.len(), "Saved search history");
        Ok(())
    }

    /// Load a saved history, appending to the current one when `merge` is set
    pub fn load(&self, path: &Path, merge: bool) -> Result<()> {
        let raw = fs::read(path)?;
        let loaded: Vec<String> = serde_json::from_slice(&raw)?;

        let mut state = self.state.lock();
        if !merge {
            state.clear();
        }
        for entry in loaded {
            state.push(entry.to_lowercase());
        }
        state.truncate(self.max_size);
        debug!(path = %path.display(), entries = state.entries.len(), merge, "Loaded search history");
        Ok(())
    }
}

impl Default for SearchHistory {
    fn default() -> Self {
        SearchHistory::new(DEFAULT_HISTORY_SIZE)
    }
}
