//! Core data model: entities, relations, and the knowledge graph they form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A node in the knowledge graph, identified by its `name`.
///
/// Agent-memory extensions (memory type, confidence, session/task/agent
/// ids, visibility, …) live in `payload` as opaque JSON — the core only
/// constrains identity, timestamps, observations, tags, importance, and
/// parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastModified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(rename = "lastAccessedAt", skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(rename = "accessCount", skip_serializing_if = "Option::is_none")]
    pub access_count: Option<u64>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Entity {
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
            tags: BTreeSet::new(),
            importance: None,
            parent_id: None,
            created_at: None,
            last_modified: None,
            last_accessed_at: None,
            access_count: None,
            payload: serde_json::Map::new(),
        }
    }

    /// Adds an observation if it is not already present, returning whether
    /// the entity's content changed.
    pub fn add_observation(&mut self, observation: impl Into<String>) -> bool {
        let observation = observation.into();
        if self.observations.iter().any(|o| o == &observation) {
            return false;
        }
        self.observations.push(observation);
        true
    }

    /// Removes matching observations, returning whether anything changed.
    pub fn delete_observations(&mut self, to_remove: &[String]) -> bool {
        let before = self.observations.len();
        self.observations.retain(|o| !to_remove.contains(o));
        self.observations.len() != before
    }
}

/// A directed, typed edge between two entities, identified by the triple
/// `(from, to, relation_type)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Relation {
    pub from: String,
    pub to: String,
    #[serde(rename = "relationType")]
    pub relation_type: String,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastModified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Relation {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Relation {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
            created_at: None,
            last_modified: None,
        }
    }

    pub fn key(&self) -> (String, String, String) {
        (self.from.clone(), self.to.clone(), self.relation_type.clone())
    }
}

/// A pair `(entities, relations)`, preserving insertion order on both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn find_entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.name == name)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entities.iter().any(|e| e.name == name)
    }

    pub fn find_relation(&self, from: &str, to: &str, relation_type: &str) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|r| r.from == from && r.to == to && r.relation_type == relation_type)
    }
}

/// One line of the on-disk record log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Entity(Entity),
    Relation(Relation),
}
