//! Dual `from → set<relation>` / `to → set<relation>` maps.

use crate::atoms::types::Relation;
use std::collections::{BTreeSet, HashMap};

type RelationKey = (String, String, String);

#[derive(Debug, Default, Clone)]
pub struct RelationIndex {
    from_map: HashMap<String, BTreeSet<RelationKey>>,
    to_map: HashMap<String, BTreeSet<RelationKey>>,
}

impl RelationIndex {
    pub fn insert(&mut self, relation: &Relation) {
        self.from_map
            .entry(relation.from.clone())
            .or_default()
            .insert(relation.key());
        self.to_map
            .entry(relation.to.clone())
            .or_default()
            .insert(relation.key());
    }

    pub fn remove(&mut self, relation: &Relation) {
        if let Some(set) = self.from_map.get_mut(&relation.from) {
            set.remove(&relation.key());
            if set.is_empty() {
                self.from_map.remove(&relation.from);
            }
        }
        if let Some(set) = self.to_map.get_mut(&relation.to) {
            set.remove(&relation.key());
            if set.is_empty() {
                self.to_map.remove(&relation.to);
            }
        }
    }

    /// All relation keys touching `name`, either as `from` or `to`,
    /// de-duplicating self-loops.
    pub fn relations_for(&self, name: &str) -> BTreeSet<RelationKey> {
        let mut result = BTreeSet::new();
        if let Some(set) = self.from_map.get(name) {
            result.extend(set.iter().cloned());
        }
        if let Some(set) = self.to_map.get(name) {
            result.extend(set.iter().cloned());
        }
        result
    }

    pub fn clear(&mut self) {
        self.from_map.clear();
        self.to_map.clear();
    }
}
