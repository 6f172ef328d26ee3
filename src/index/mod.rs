//! The index set (C2): built lazily after a cache load, maintained
//! incrementally under the same mutex as the cache thereafter.

pub mod lowercase_cache;
pub mod name_index;
pub mod observation_index;
pub mod relation_index;
pub mod type_index;

pub use observation_index::tokenize;

use crate::atoms::types::{Entity, KnowledgeGraph, Relation};
use lowercase_cache::LowercaseCache;
use name_index::NameIndex;
use observation_index::ObservationIndex;
use relation_index::RelationIndex;
use type_index::TypeIndex;

#[derive(Debug, Default, Clone)]
pub struct Indices {
    pub name: NameIndex,
    pub type_idx: TypeIndex,
    pub lowercase: LowercaseCache,
    pub relation: RelationIndex,
    pub observation: ObservationIndex,
    ready: bool,
}

fn searchable_fields(entity: &Entity) -> Vec<String> {
    let mut fields = vec![entity.name.clone(), entity.entity_type.clone()];
    fields.extend(entity.tags.iter().cloned());
    fields.extend(entity.observations.iter().cloned());
    fields
}

impl Indices {
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Rebuilds every index from scratch against the given graph. Called on
    /// first search after a cache load, and after a full compaction.
    pub fn rebuild(&mut self, graph: &KnowledgeGraph) {
        self.name.rebuild(graph.entities.iter().map(|e| e.name.clone()));
        self.type_idx.clear();
        self.lowercase.clear();
        self.relation.clear();
        self.observation.clear();

        for entity in &graph.entities {
            self.type_idx.insert(&entity.entity_type, &entity.name);
            self.lowercase.set(entity);
            let fields = searchable_fields(entity);
            let refs: Vec<&str> = fields.iter().map(|s| s.as_str()).collect();
            self.observation.index_entity(&entity.name, &refs);
        }
        for relation in &graph.relations {
            self.relation.insert(relation);
        }
        self.ready = true;
    }

    /// `graph` is the post-mutation graph; the name index is cheap enough to
    /// rebuild wholesale on every structural change (insert/delete) rather
    /// than track position shifts incrementally.
    pub fn on_entity_created(&mut self, graph: &KnowledgeGraph, entity: &Entity) {
        self.name.rebuild(graph.entities.iter().map(|e| e.name.clone()));
        self.type_idx.insert(&entity.entity_type, &entity.name);
        self.lowercase.set(entity);
        let fields = searchable_fields(entity);
        let refs: Vec<&str> = fields.iter().map(|s| s.as_str()).collect();
        self.observation.index_entity(&entity.name, &refs);
    }

    pub fn on_entity_updated(&mut self, old: &Entity, new: &Entity) {
        if old.entity_type != new.entity_type {
            self.type_idx.remove(&old.entity_type, &old.name);
            self.type_idx.insert(&new.entity_type, &new.name);
        }
        self.lowercase.set(new);
        let fields = searchable_fields(new);
        let refs: Vec<&str> = fields.iter().map(|s| s.as_str()).collect();
        self.observation.index_entity(&new.name, &refs);
    }

    pub fn on_entity_deleted(&mut self, graph: &KnowledgeGraph, entity: &Entity) {
        self.name.rebuild(graph.entities.iter().map(|e| e.name.clone()));
        self.type_idx.remove(&entity.entity_type, &entity.name);
        self.lowercase.remove(&entity.name);
        self.observation.remove_entity(&entity.name);
    }

    pub fn on_relation_created(&mut self, relation: &Relation) {
        self.relation.insert(relation);
    }

    pub fn on_relation_deleted(&mut self, relation: &Relation) {
        self.relation.remove(relation);
    }
}
