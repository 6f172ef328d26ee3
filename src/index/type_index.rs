//! Case-insensitive `entityType → set<name>` index with empty-bucket cleanup.

use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default, Clone)]
pub struct TypeIndex {
    buckets: HashMap<String, BTreeSet<String>>,
}

impl TypeIndex {
    pub fn insert(&mut self, entity_type: &str, name: &str) {
        self.buckets
            .entry(entity_type.to_lowercase())
            .or_default()
            .insert(name.to_string());
    }

    pub fn remove(&mut self, entity_type: &str, name: &str) {
        let key = entity_type.to_lowercase();
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(name);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    pub fn names_for(&self, entity_type: &str) -> BTreeSet<String> {
        self.buckets
            .get(&entity_type.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
