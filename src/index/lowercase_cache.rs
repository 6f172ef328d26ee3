//! Precomputed lowercase projections of each entity's searchable fields.
//!
//! Tags are resolved (lowercased/trimmed) at read time here; storage keeps
//! the original-case tag, per the tag-alias resolution decision in
//! SPEC_FULL.md §9.

use crate::atoms::types::Entity;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct LowercaseEntry {
    pub name_lower: String,
    pub type_lower: String,
    pub observations_lower: Vec<String>,
    pub tags_lower: Vec<String>,
}

impl LowercaseEntry {
    pub fn from_entity(entity: &Entity) -> Self {
        LowercaseEntry {
            name_lower: entity.name.to_lowercase(),
            type_lower: entity.entity_type.to_lowercase(),
            observations_lower: entity.observations.iter().map(|o| o.to_lowercase()).collect(),
            tags_lower: entity.tags.iter().map(|t| t.to_lowercase()).collect(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct LowercaseCache {
    entries: HashMap<String, LowercaseEntry>,
}

impl LowercaseCache {
    pub fn set(&mut self, entity: &Entity) {
        self.entries
            .insert(entity.name.clone(), LowercaseEntry::from_entity(entity));
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<&LowercaseEntry> {
        self.entries.get(name)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
