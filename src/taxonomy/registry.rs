use std::collections::HashMap;
use parking_lot::RwLock;
use tracing::info;
use crate::core::error::{Error, ErrorKind, Result};
use crate::taxonomy::category::{validate_group, Category};
use crate::taxonomy::subjects;

#[derive(Default)]
struct RegistryState {
    categories: Vec<Category>,            // registration order
    by_name: HashMap<String, usize>,      // exact display name
    by_lower_name: HashMap<String, usize>,
    by_group: HashMap<u8, Vec<usize>>,
    active: Vec<usize>,
    inactive: Vec<usize>,
}

impl RegistryState {
    fn find(&self, name: &str) -> Option<&Category> {
        if let Some(&idx) = self.by_name.get(name) {
            return Some(&self.categories[idx]);
        }
        self.categories.iter().find(|c| c.is_named(name))
    }

    fn insert(&mut self, category: Category) -> Result<()> {
        let lowered = category.display_name().to_lowercase();
        if self.by_lower_name.contains_key(&lowered) {
            return Err(Error::new(
                ErrorKind::DuplicateName,
                format!("Category already registered: {}", category.display_name()),
            ));
        }
        let idx = self.categories.len();
        self.by_name.insert(category.display_name().to_string(), idx);
        self.by_lower_name.insert(lowered, idx);
        self.by_group.entry(category.group()).or_default().push(idx);
        if category.is_active() {
            self.active.push(idx);
        } else {
            self.inactive.push(idx);
        }
        self.categories.push(category);
        Ok(())
    }

    fn collect(&self, indices: &[usize]) -> Vec<Category> {
        indices.iter().map(|&idx| self.categories[idx].clone()).collect()
    }
}

/// Read-mostly lookup table of subject categories. Every read takes the shared
/// lock, every mutation the exclusive lock; nothing blocks on I/O while holding it.
pub struct ReferenceRegistry {
    state: RwLock<RegistryState>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        ReferenceRegistry {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Registry seeded with the built-in subjects of groups 3 to 6
    pub fn with_default_taxonomy() -> Self {
        let registry = ReferenceRegistry::new();
        {
            let mut state = registry.state.write();
            for category in subjects::default_subjects() {
                // Built-in names are distinct
                let _ = state.insert(category);
            }
        }
        registry
    }

    pub fn register(&self, category: Category) -> Result<()> {
        let name = category.display_name().to_string();
        self.state.write().insert(category)?;
        info!(category = %name, "registered category");
        Ok(())
    }

    /// Look `name` up and, if absent, register the category built by `make`.
    /// Lookup and insert happen under one exclusive lock so racing callers
    /// agree on a single instance.
    pub fn get_or_register<F>(&self, name: &str, make: F) -> Result<Category>
    where
        F: FnOnce() -> Result<Category>,
    {
        if let Some(found) = self.lookup_by_name(name) {
            return Ok(found);
        }
        let mut state = self.state.write();
        if let Some(found) = state.find(name) {
            return Ok(found.clone());
        }
        let category = make()?;
        state.insert(category.clone())?;
        info!(category = %category.display_name(), group = category.group(), "auto-registered category");
        Ok(category)
    }

    /// O(1) on an exact display name, otherwise a case-insensitive scan over
    /// display names and aliases
    pub fn lookup_by_name(&self, name: &str) -> Option<Category> {
        self.state.read().find(name).cloned()
    }

    pub fn lookup_all_by_name(&self, name: &str) -> Vec<Category> {
        self.state
            .read()
            .categories
            .iter()
            .filter(|c| c.is_named(name))
            .cloned()
            .collect()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.state.read().find(name).is_some()
    }

    pub fn list_by_group(&self, group: u8) -> Result<Vec<Category>> {
        validate_group(group)?;
        let state = self.state.read();
        Ok(state
            .by_group
            .get(&group)
            .map(|indices| state.collect(indices))
            .unwrap_or_default())
    }

    pub fn list_active(&self) -> Vec<Category> {
        let state = self.state.read();
        state.collect(&state.active)
    }

    pub fn list_inactive(&self) -> Vec<Category> {
        let state = self.state.read();
        state.collect(&state.inactive)
    }

    pub fn len(&self) -> usize {
        self.state.read().categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReferenceRegistry {
    fn default() -> Self {
        ReferenceRegistry::new()
    }
}
