//! The record log and in-memory cache (C1): append-only NDJSON on disk, an
//! authoritative in-memory `KnowledgeGraph`, a single mutation mutex, and
//! atomic full rewrites. Generalised from the teacher's
//! `SessionStore { conn: Mutex<Connection> }` pattern
//! (`engine/sessions/mod.rs`) and the `persist_to_file`-after-every-mutation
//! discipline in the reference knowledge-graph CRUD module.

use crate::atoms::error::{GraphError, GraphResult};
use crate::atoms::types::{Entity, KnowledgeGraph, Record, Relation};
use crate::config::GraphConfig;
use crate::index::Indices;
use crate::store::events::{EventEmitter, GraphEvent};
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct StoreInner {
    graph: KnowledgeGraph,
    indices: Indices,
    append_count: u64,
    loaded: bool,
}

/// Guards the single mutation mutex; owns the cache, indices, and append
/// counter. `load_graph` takes the mutex only for the lazy first load.
pub struct GraphStore {
    path: PathBuf,
    config: GraphConfig,
    emitter: Arc<EventEmitter>,
    inner: Mutex<StoreInner>,
}

impl GraphStore {
    pub fn new(path: impl Into<PathBuf>, config: GraphConfig, emitter: Arc<EventEmitter>) -> Self {
        GraphStore {
            path: path.into(),
            config,
            emitter,
            inner: Mutex::new(StoreInner {
                graph: KnowledgeGraph::new(),
                indices: Indices::default(),
                append_count: 0,
                loaded: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }

    fn ensure_loaded(&self, inner: &mut StoreInner) -> GraphResult<()> {
        if inner.loaded {
            return Ok(());
        }
        inner.graph = read_log(&self.path)?;
        inner.indices.rebuild(&inner.graph);
        inner.loaded = true;
        self.emitter.emit(&GraphEvent::GraphLoaded {
            at: Utc::now(),
            entity_count: inner.graph.entities.len(),
            relation_count: inner.graph.relations.len(),
        })?;
        Ok(())
    }

    /// Returns a read-only snapshot of the cache, lazily initialising it.
    pub fn load_graph(&self) -> GraphResult<KnowledgeGraph> {
        let mut inner = self.inner.lock();
        self.ensure_loaded(&mut inner)?;
        Ok(inner.graph.clone())
    }

    /// Returns a read-only snapshot of the indices, lazily initialising.
    /// Used by search to confirm readiness (`IndexNotReady`).
    pub fn ensure_indices_ready(&self) -> GraphResult<()> {
        let mut inner = self.inner.lock();
        self.ensure_loaded(&mut inner)?;
        Ok(())
    }

    /// Returns a consistent `(graph, indices)` pair, lazily initialising.
    /// The search dispatcher reads both under one lock acquisition so a
    /// concurrent mutation can't be observed as a graph from after the
    /// mutation paired with indices from before it (or vice versa).
    pub fn snapshot(&self) -> GraphResult<(KnowledgeGraph, Indices)> {
        let mut inner = self.inner.lock();
        self.ensure_loaded(&mut inner)?;
        Ok((inner.graph.clone(), inner.indices.clone()))
    }

    /// Runs `f` against a single mutable handle on the cache, indices, and
    /// log, holding the mutation mutex for the whole closure. This is the
    /// "single handle at a time" contract `get_graph_for_mutation` describes
    /// in SPEC_FULL.md §4.1 — modelled as a scoped closure instead of a
    /// returned guard so callers can't hold it across an await point.
    pub fn with_mutation<R>(
        &self,
        f: impl FnOnce(&mut MutationContext) -> GraphResult<R>,
    ) -> GraphResult<R> {
        let mut inner = self.inner.lock();
        self.ensure_loaded(&mut inner)?;
        let mut ctx = MutationContext {
            path: &self.path,
            config: &self.config,
            emitter: &self.emitter,
            graph: &mut inner.graph,
            indices: &mut inner.indices,
            append_count: &mut inner.append_count,
        };
        let result = f(&mut ctx)?;
        if *ctx.append_count >= self.config.compaction_threshold {
            compact(ctx.path, ctx.graph, ctx.append_count, &self.emitter)?;
        }
        Ok(result)
    }
}

/// The mutable handle passed to `with_mutation` closures.
pub struct MutationContext<'a> {
    path: &'a Path,
    config: &'a GraphConfig,
    emitter: &'a Arc<EventEmitter>,
    pub graph: &'a mut KnowledgeGraph,
    pub indices: &'a mut Indices,
    append_count: &'a mut u64,
}

impl<'a> MutationContext<'a> {
    pub fn config(&self) -> &GraphConfig {
        self.config
    }

    fn append_record(&mut self, record: &Record) -> GraphResult<()> {
        append_line(self.path, record)?;
        *self.append_count += 1;
        Ok(())
    }

    pub fn append_entity(&mut self, mut entity: Entity) -> GraphResult<Entity> {
        if self.graph.has_entity(&entity.name) {
            return Err(GraphError::duplicate_entity(entity.name));
        }
        if let Some(importance) = entity.importance {
            if !(0.0..=10.0).contains(&importance) {
                return Err(GraphError::InvalidImportance { value: importance });
            }
        }
        if let Some(parent) = &entity.parent_id {
            if parent == &entity.name {
                return Err(GraphError::cycle_detected(entity.name.clone(), parent.clone()));
            }
        }
        let now = Utc::now();
        entity.created_at = entity.created_at.or(Some(now));
        entity.last_modified = entity.last_modified.or(Some(now));

        self.graph.entities.push(entity.clone());
        self.append_record(&Record::Entity(entity.clone()))?;
        self.indices.on_entity_created(self.graph, &entity);
        self.emitter.emit(&GraphEvent::EntityCreated {
            at: now,
            name: entity.name.clone(),
        })?;
        Ok(entity)
    }

    pub fn append_relation(&mut self, mut relation: Relation) -> GraphResult<Relation> {
        if !self.graph.has_entity(&relation.from) {
            return Err(GraphError::entity_not_found(relation.from.clone()));
        }
        if !self.graph.has_entity(&relation.to) {
            return Err(GraphError::entity_not_found(relation.to.clone()));
        }
        if self
            .graph
            .find_relation(&relation.from, &relation.to, &relation.relation_type)
            .is_some()
        {
            return Err(GraphError::validation_failed(format!(
                "relation ({}, {}, {}) already exists",
                relation.from, relation.to, relation.relation_type
            )));
        }
        let now = Utc::now();
        relation.created_at = relation.created_at.or(Some(now));
        relation.last_modified = relation.last_modified.or(Some(now));

        self.graph.relations.push(relation.clone());
        self.append_record(&Record::Relation(relation.clone()))?;
        self.indices.on_relation_created(&relation);
        self.emitter.emit(&GraphEvent::RelationCreated {
            at: now,
            from: relation.from.clone(),
            to: relation.to.clone(),
            relation_type: relation.relation_type.clone(),
        })?;
        Ok(relation)
    }

    /// Applies `mutate` to a clone of the named entity and persists the full
    /// resulting snapshot (not a partial diff) if it actually changed
    /// anything. A mutate that leaves the entity equal to `old` is a no-op:
    /// no `lastModified` bump, no log line, no event.
    pub fn update_entity(
        &mut self,
        name: &str,
        mutate: impl FnOnce(&mut Entity),
    ) -> GraphResult<Entity> {
        let index = self
            .graph
            .entities
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| GraphError::entity_not_found(name))?;

        let old = self.graph.entities[index].clone();
        let mut new = old.clone();
        mutate(&mut new);

        if new == old {
            return Ok(old);
        }

        new.last_modified = Some(Utc::now());

        if let Some(importance) = new.importance {
            if !(0.0..=10.0).contains(&importance) {
                return Err(GraphError::InvalidImportance { value: importance });
            }
        }

        self.graph.entities[index] = new.clone();
        self.append_record(&Record::Entity(new.clone()))?;
        self.indices.on_entity_updated(&old, &new);

        let changes = serde_json::to_value(&new).unwrap_or(serde_json::Value::Null);
        let previous = serde_json::to_value(&old).unwrap_or(serde_json::Value::Null);
        self.emitter.emit(&GraphEvent::EntityUpdated {
            at: new.last_modified.unwrap(),
            name: name.to_string(),
            changes,
            previous,
        })?;
        Ok(new)
    }

    /// Adds observations, deduplicated against the existing list, inside the
    /// mutation mutex — resolving the `addObservations` concurrency open
    /// question per SPEC_FULL.md §9 (the read-modify-write happens here).
    pub fn add_observations(&mut self, name: &str, observations: &[String]) -> GraphResult<Entity> {
        let mut added = Vec::new();
        let updated = self.update_entity(name, |entity| {
            for obs in observations {
                if entity.add_observation(obs.clone()) {
                    added.push(obs.clone());
                }
            }
        })?;
        for obs in &added {
            self.emitter.emit(&GraphEvent::ObservationAdded {
                at: Utc::now(),
                name: name.to_string(),
                observation: obs.clone(),
            })?;
        }
        Ok(updated)
    }

    pub fn delete_observations(&mut self, name: &str, observations: &[String]) -> GraphResult<Entity> {
        let updated = self.update_entity(name, |entity| {
            entity.delete_observations(observations);
        })?;
        for obs in observations {
            self.emitter.emit(&GraphEvent::ObservationDeleted {
                at: Utc::now(),
                name: name.to_string(),
                observation: obs.clone(),
            })?;
        }
        Ok(updated)
    }

    /// Deletes an entity, cascading to relations where it's an endpoint and
    /// detaching any child pointers.
    ///
    /// The append-only record shape has no way to express "this name is now
    /// gone" short of a full rewrite, so deletion goes straight through
    /// `save_graph` rather than appending — the live file is always a
    /// complete, deletion-consistent snapshot afterwards.
    pub fn delete_entity(&mut self, name: &str) -> GraphResult<()> {
        let index = self
            .graph
            .entities
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| GraphError::entity_not_found(name))?;
        let entity = self.graph.entities.remove(index);

        let orphaned_relations: Vec<Relation> = self
            .graph
            .relations
            .iter()
            .filter(|r| r.from == name || r.to == name)
            .cloned()
            .collect();
        self.graph.relations.retain(|r| r.from != name && r.to != name);

        let children: Vec<String> = self
            .graph
            .entities
            .iter()
            .filter(|e| e.parent_id.as_deref() == Some(name))
            .map(|e| e.name.clone())
            .collect();
        for child in &children {
            if let Some(child_entity) = self.graph.find_entity_mut(child) {
                child_entity.parent_id = None;
                child_entity.last_modified = Some(Utc::now());
            }
        }

        self.indices.on_entity_deleted(self.graph, &entity);
        for relation in &orphaned_relations {
            self.indices.on_relation_deleted(relation);
        }
        self.save()?;

        self.emitter.emit(&GraphEvent::EntityDeleted {
            at: Utc::now(),
            name: name.to_string(),
        })?;
        for relation in &orphaned_relations {
            self.emitter.emit(&GraphEvent::RelationDeleted {
                at: Utc::now(),
                from: relation.from.clone(),
                to: relation.to.clone(),
                relation_type: relation.relation_type.clone(),
            })?;
        }
        Ok(())
    }

    pub fn delete_relation(&mut self, from: &str, to: &str, relation_type: &str) -> GraphResult<()> {
        let index = self
            .graph
            .relations
            .iter()
            .position(|r| r.from == from && r.to == to && r.relation_type == relation_type)
            .ok_or_else(|| GraphError::relation_not_found(from, to, relation_type))?;
        let relation = self.graph.relations.remove(index);
        self.indices.on_relation_deleted(&relation);
        self.save()?;
        self.emitter.emit(&GraphEvent::RelationDeleted {
            at: Utc::now(),
            from: from.to_string(),
            to: to.to_string(),
            relation_type: relation_type.to_string(),
        })?;
        Ok(())
    }

    /// Full atomic rewrite via `save_graph`.
    pub fn save(&mut self) -> GraphResult<()> {
        save_graph(self.path, self.graph)?;
        *self.append_count = 0;
        self.emitter.emit(&GraphEvent::GraphSaved {
            at: Utc::now(),
            entity_count: self.graph.entities.len(),
            relation_count: self.graph.relations.len(),
        })?;
        Ok(())
    }

    pub fn compact(&mut self) -> GraphResult<()> {
        self.save()
    }
}

fn compact(
    path: &Path,
    graph: &mut KnowledgeGraph,
    append_count: &mut u64,
    emitter: &Arc<EventEmitter>,
) -> GraphResult<()> {
    save_graph(path, graph)?;
    *append_count = 0;
    emitter.emit(&GraphEvent::GraphSaved {
        at: Utc::now(),
        entity_count: graph.entities.len(),
        relation_count: graph.relations.len(),
    })?;
    Ok(())
}

fn read_log(path: &Path) -> GraphResult<KnowledgeGraph> {
    if !path.exists() {
        return Ok(KnowledgeGraph::new());
    }
    let file = File::open(path).map_err(|e| GraphError::StorageRead {
        reason: e.to_string(),
    })?;
    let reader = BufReader::new(file);

    let mut graph = KnowledgeGraph::new();
    let mut entity_order: Vec<String> = Vec::new();
    let mut relation_order: Vec<(String, String, String)> = Vec::new();
    let mut entity_map: std::collections::HashMap<String, Entity> = std::collections::HashMap::new();
    let mut relation_map: std::collections::HashMap<(String, String, String), Relation> =
        std::collections::HashMap::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| GraphError::StorageRead {
            reason: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(&line) {
            Ok(Record::Entity(entity)) => {
                if !entity_map.contains_key(&entity.name) {
                    entity_order.push(entity.name.clone());
                }
                entity_map.insert(entity.name.clone(), entity);
            }
            Ok(Record::Relation(relation)) => {
                let key = relation.key();
                if !relation_map.contains_key(&key) {
                    relation_order.push(key.clone());
                }
                relation_map.insert(key, relation);
            }
            Err(err) => {
                log::warn!("skipping malformed log line {lineno} in {path:?}: {err}");
            }
        }
    }

    graph.entities = entity_order
        .into_iter()
        .filter_map(|name| entity_map.remove(&name))
        .collect();
    graph.relations = relation_order
        .into_iter()
        .filter_map(|key| relation_map.remove(&key))
        .collect();
    Ok(graph)
}

fn append_line(path: &Path, record: &Record) -> GraphResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| GraphError::StorageWrite {
                reason: e.to_string(),
            })?;
        }
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| GraphError::StorageWrite {
            reason: e.to_string(),
        })?;
    let line = serde_json::to_string(record)?;
    writeln!(file, "{line}").map_err(|e| GraphError::StorageWrite {
        reason: e.to_string(),
    })?;
    file.sync_all().map_err(|e| GraphError::StorageWrite {
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Serialises `graph` to a temp file in the same directory, `fsync`s it,
/// then renames it over the live path — an I/O failure here always leaves
/// the previous file intact, since `rename` is atomic.
fn save_graph(path: &Path, graph: &KnowledgeGraph) -> GraphResult<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(|e| GraphError::StorageWrite {
            reason: e.to_string(),
        })?;
    }
    let tmp_path = path.with_extension("tmp-rewrite");

    {
        let mut tmp = File::create(&tmp_path).map_err(|e| GraphError::StorageWrite {
            reason: e.to_string(),
        })?;
        for entity in &graph.entities {
            let line = serde_json::to_string(&Record::Entity(entity.clone()))?;
            writeln!(tmp, "{line}").map_err(|e| GraphError::StorageWrite {
                reason: e.to_string(),
            })?;
        }
        for relation in &graph.relations {
            let line = serde_json::to_string(&Record::Relation(relation.clone()))?;
            writeln!(tmp, "{line}").map_err(|e| GraphError::StorageWrite {
                reason: e.to_string(),
            })?;
        }
        tmp.sync_all().map_err(|e| GraphError::StorageWrite {
            reason: e.to_string(),
        })?;
    }

    fs::rename(&tmp_path, path).map_err(|e| GraphError::StorageWrite {
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;

    fn store(dir: &tempfile::TempDir) -> GraphStore {
        GraphStore::new(
            dir.path().join("graph.jsonl"),
            GraphConfig::default(),
            Arc::new(EventEmitter::new(false)),
        )
    }

    #[test]
    fn append_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store
            .with_mutation(|ctx| ctx.append_entity(Entity::new("Alice", "person")))
            .unwrap();

        let graph = store.load_graph().unwrap();
        assert_eq!(graph.entities.len(), 1);
        assert_eq!(graph.entities[0].name, "Alice");

        let reloaded = GraphStore::new(store.path().to_path_buf(), GraphConfig::default(), Arc::new(EventEmitter::new(false)));
        let graph2 = reloaded.load_graph().unwrap();
        assert_eq!(graph2.entities.len(), 1);
    }

    #[test]
    fn duplicate_entity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store
            .with_mutation(|ctx| ctx.append_entity(Entity::new("Alice", "person")))
            .unwrap();
        let result = store.with_mutation(|ctx| ctx.append_entity(Entity::new("Alice", "person")));
        assert!(matches!(result, Err(GraphError::DuplicateEntity { .. })));
    }

    #[test]
    fn delete_cascades_relations_and_detaches_children() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store
            .with_mutation(|ctx| {
                ctx.append_entity(Entity::new("A", "person"))?;
                ctx.append_entity(Entity::new("B", "person"))?;
                ctx.append_relation(Relation::new("A", "B", "knows"))?;
                ctx.update_entity("B", |e| e.parent_id = Some("A".to_string()))?;
                Ok(())
            })
            .unwrap();

        store.with_mutation(|ctx| ctx.delete_entity("A")).unwrap();
        let graph = store.load_graph().unwrap();
        assert!(graph.find_entity("A").is_none());
        assert!(graph.relations.is_empty());
        assert_eq!(graph.find_entity("B").unwrap().parent_id, None);
    }

    #[test]
    fn add_observations_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store
            .with_mutation(|ctx| ctx.append_entity(Entity::new("A", "person")))
            .unwrap();
        store
            .with_mutation(|ctx| {
                ctx.add_observations("A", &["loves pasta".to_string(), "loves pasta".to_string()])
            })
            .unwrap();
        let graph = store.load_graph().unwrap();
        assert_eq!(graph.find_entity("A").unwrap().observations, vec!["loves pasta"]);
    }

    #[test]
    fn duplicate_observation_is_a_no_op_on_content_and_last_modified() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store
            .with_mutation(|ctx| ctx.append_entity(Entity::new("A", "person")))
            .unwrap();
        let first = store
            .with_mutation(|ctx| ctx.add_observations("A", &["loves pasta".to_string()]))
            .unwrap();

        let second = store
            .with_mutation(|ctx| ctx.add_observations("A", &["loves pasta".to_string()]))
            .unwrap();

        assert_eq!(second.observations, vec!["loves pasta"]);
        assert_eq!(second.last_modified, first.last_modified);
    }
}
