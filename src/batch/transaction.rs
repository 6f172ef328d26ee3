//! The transaction batch (C7): a fluent, ordered, pre-validated multi-op
//! batch over a single commit window. Generalised from the reference
//! knowledge-graph CRUD module's single-write-lock-hold, existence-checked
//! multi-entity mutations.

use crate::atoms::error::{GraphError, GraphResult};
use crate::atoms::types::{Entity, KnowledgeGraph, Relation};
use crate::store::GraphStore;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct EntityChanges {
    pub entity_type: Option<String>,
    pub tags_add: Vec<String>,
    pub tags_remove: Vec<String>,
    pub importance: Option<f64>,
    /// `Some(None)` clears the parent; `Some(Some(name))` sets it.
    pub parent_id: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub enum BatchOperation {
    CreateEntity(Entity),
    CreateRelation(Relation),
    UpdateEntity { name: String, changes: EntityChanges },
    DeleteEntity { name: String },
    DeleteRelation { from: String, to: String, relation_type: String },
    AddObservations { name: String, observations: Vec<String> },
    DeleteObservations { name: String, observations: Vec<String> },
}

#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    pub validate: bool,
    pub stop_on_error: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        ExecuteOptions {
            validate: true,
            stop_on_error: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub success: bool,
    pub operations_executed: usize,
    pub entities_created: usize,
    pub entities_updated: usize,
    pub entities_deleted: usize,
    pub relations_created: usize,
    pub relations_deleted: usize,
    pub execution_time_ms: u64,
    pub error: Option<String>,
    pub failed_operation_index: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionBatch {
    operations: Vec<BatchOperation>,
}

impl TransactionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_entity(&mut self, entity: Entity) -> &mut Self {
        self.operations.push(BatchOperation::CreateEntity(entity));
        self
    }

    pub fn create_relation(&mut self, relation: Relation) -> &mut Self {
        self.operations.push(BatchOperation::CreateRelation(relation));
        self
    }

    pub fn update_entity(&mut self, name: impl Into<String>, changes: EntityChanges) -> &mut Self {
        self.operations.push(BatchOperation::UpdateEntity {
            name: name.into(),
            changes,
        });
        self
    }

    pub fn delete_entity(&mut self, name: impl Into<String>) -> &mut Self {
        self.operations.push(BatchOperation::DeleteEntity { name: name.into() });
        self
    }

    pub fn delete_relation(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> &mut Self {
        self.operations.push(BatchOperation::DeleteRelation {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        });
        self
    }

    pub fn add_observations(&mut self, name: impl Into<String>, observations: Vec<String>) -> &mut Self {
        self.operations.push(BatchOperation::AddObservations {
            name: name.into(),
            observations,
        });
        self
    }

    pub fn delete_observations(&mut self, name: impl Into<String>, observations: Vec<String>) -> &mut Self {
        self.operations.push(BatchOperation::DeleteObservations {
            name: name.into(),
            observations,
        });
        self
    }

    pub fn size(&self) -> usize {
        self.operations.len()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    pub fn get_operations(&self) -> &[BatchOperation] {
        &self.operations
    }

    pub fn add_operations(&mut self, mut ops: Vec<BatchOperation>) -> &mut Self {
        self.operations.append(&mut ops);
        self
    }

    pub fn execute(&self, store: &GraphStore, options: ExecuteOptions) -> GraphResult<ExecutionResult> {
        let start = std::time::Instant::now();

        if options.validate {
            let graph = store.load_graph()?;
            if let Some(index) = validate(&graph, &self.operations) {
                return Ok(ExecutionResult {
                    success: false,
                    failed_operation_index: Some(index),
                    error: Some(format!("validation failed at operation {index}")),
                    execution_time_ms: start.elapsed().as_millis() as u64,
                    ..Default::default()
                });
            }
        }

        let operations = self.operations.clone();
        let stop_on_error = options.stop_on_error;

        let mut stats = ExecutionResult::default();
        store.with_mutation(|ctx| {
            for (i, op) in operations.iter().enumerate() {
                let outcome = apply_operation(ctx, op);
                match outcome {
                    Ok(()) => {
                        stats.operations_executed += 1;
                    }
                    Err(err) => {
                        stats.failed_operation_index.get_or_insert(i);
                        stats.error.get_or_insert(err.to_string());
                        if stop_on_error {
                            return Ok(());
                        }
                    }
                }
            }
            ctx.save()
        })?;

        stats.success = stats.failed_operation_index.is_none();
        stats.execution_time_ms = start.elapsed().as_millis() as u64;
        count_effects(&operations, &mut stats);
        Ok(stats)
    }
}

fn count_effects(operations: &[BatchOperation], stats: &mut ExecutionResult) {
    let executed = stats.operations_executed;
    for op in operations.iter().take(executed) {
        match op {
            BatchOperation::CreateEntity(_) => stats.entities_created += 1,
            BatchOperation::CreateRelation(_) => stats.relations_created += 1,
            BatchOperation::UpdateEntity { .. }
            | BatchOperation::AddObservations { .. }
            | BatchOperation::DeleteObservations { .. } => stats.entities_updated += 1,
            BatchOperation::DeleteEntity { .. } => stats.entities_deleted += 1,
            BatchOperation::DeleteRelation { .. } => stats.relations_deleted += 1,
        }
    }
}

fn apply_operation(ctx: &mut crate::store::MutationContext, op: &BatchOperation) -> GraphResult<()> {
    match op {
        BatchOperation::CreateEntity(entity) => {
            ctx.append_entity(entity.clone())?;
        }
        BatchOperation::CreateRelation(relation) => {
            ctx.append_relation(relation.clone())?;
        }
        BatchOperation::UpdateEntity { name, changes } => {
            let changes = changes.clone();
            ctx.update_entity(name, move |entity| {
                if let Some(entity_type) = changes.entity_type {
                    entity.entity_type = entity_type;
                }
                for tag in changes.tags_add {
                    entity.tags.insert(tag);
                }
                for tag in changes.tags_remove {
                    entity.tags.remove(&tag);
                }
                if let Some(importance) = changes.importance {
                    entity.importance = Some(importance);
                }
                if let Some(parent) = changes.parent_id {
                    entity.parent_id = parent;
                }
            })?;
        }
        BatchOperation::DeleteEntity { name } => {
            ctx.delete_entity(name)?;
        }
        BatchOperation::DeleteRelation { from, to, relation_type } => {
            ctx.delete_relation(from, to, relation_type)?;
        }
        BatchOperation::AddObservations { name, observations } => {
            ctx.add_observations(name, observations)?;
        }
        BatchOperation::DeleteObservations { name, observations } => {
            ctx.delete_observations(name, observations)?;
        }
    }
    Ok(())
}

/// Simulates every operation in order against a shadow copy of the cache,
/// returning the index of the first operation that would fail.
fn validate(graph: &KnowledgeGraph, operations: &[BatchOperation]) -> Option<usize> {
    let mut existing: HashSet<String> = graph.entities.iter().map(|e| e.name.clone()).collect();
    let mut deleted: HashSet<String> = HashSet::new();
    let mut parents: HashMap<String, Option<String>> = graph
        .entities
        .iter()
        .map(|e| (e.name.clone(), e.parent_id.clone()))
        .collect();
    let mut relation_keys: HashSet<(String, String, String)> =
        graph.relations.iter().map(|r| r.key()).collect();

    for (i, op) in operations.iter().enumerate() {
        match op {
            BatchOperation::CreateEntity(entity) => {
                if existing.contains(&entity.name) && !deleted.contains(&entity.name) {
                    return Some(i);
                }
                if let Some(importance) = entity.importance {
                    if !(0.0..=10.0).contains(&importance) {
                        return Some(i);
                    }
                }
                existing.insert(entity.name.clone());
                deleted.remove(&entity.name);
                parents.insert(entity.name.clone(), entity.parent_id.clone());
            }
            BatchOperation::CreateRelation(relation) => {
                let from_ok = existing.contains(&relation.from) && !deleted.contains(&relation.from);
                let to_ok = existing.contains(&relation.to) && !deleted.contains(&relation.to);
                if !from_ok || !to_ok {
                    return Some(i);
                }
                if !relation_keys.insert(relation.key()) {
                    return Some(i);
                }
            }
            BatchOperation::UpdateEntity { name, changes } => {
                if !existing.contains(name) || deleted.contains(name) {
                    return Some(i);
                }
                if let Some(importance) = changes.importance {
                    if !(0.0..=10.0).contains(&importance) {
                        return Some(i);
                    }
                }
                if let Some(new_parent) = &changes.parent_id {
                    if let Some(parent_name) = new_parent {
                        if would_cycle(&parents, name, parent_name) {
                            return Some(i);
                        }
                    }
                    parents.insert(name.clone(), new_parent.clone());
                }
            }
            BatchOperation::DeleteEntity { name } => {
                if !existing.contains(name) || deleted.contains(name) {
                    return Some(i);
                }
                deleted.insert(name.clone());
            }
            BatchOperation::DeleteRelation { from, to, relation_type } => {
                let key = (from.clone(), to.clone(), relation_type.clone());
                if !relation_keys.remove(&key) {
                    return Some(i);
                }
            }
            BatchOperation::AddObservations { name, .. } | BatchOperation::DeleteObservations { name, .. } => {
                if !existing.contains(name) || deleted.contains(name) {
                    return Some(i);
                }
            }
        }
    }
    None
}

fn would_cycle(parents: &HashMap<String, Option<String>>, name: &str, new_parent: &str) -> bool {
    if name == new_parent {
        return true;
    }
    let mut visited = HashSet::new();
    let mut current = Some(new_parent.to_string());
    while let Some(node) = current {
        if node == name || !visited.insert(node.clone()) {
            return true;
        }
        current = parents.get(&node).cloned().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::store::EventEmitter;
    use std::sync::Arc;

    fn store() -> (tempfile::TempDir, GraphStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(
            dir.path().join("graph.jsonl"),
            GraphConfig::default(),
            Arc::new(EventEmitter::new(false)),
        );
        (dir, store)
    }

    #[test]
    fn validation_failure_aborts_before_any_entity_created() {
        let (_dir, store) = store();
        let mut batch = TransactionBatch::new();
        batch
            .create_entity(Entity::new("X", "person"))
            .create_relation(Relation::new("X", "Y", "knows"));

        let result = batch.execute(&store, ExecuteOptions::default()).unwrap();
        assert!(!result.success);
        assert_eq!(result.failed_operation_index, Some(1));
        let graph = store.load_graph().unwrap();
        assert!(graph.entities.is_empty());
    }

    #[test]
    fn valid_batch_commits_once() {
        let (_dir, store) = store();
        let mut batch = TransactionBatch::new();
        batch
            .create_entity(Entity::new("X", "person"))
            .create_entity(Entity::new("Y", "person"))
            .create_relation(Relation::new("X", "Y", "knows"));

        let result = batch.execute(&store, ExecuteOptions::default()).unwrap();
        assert!(result.success);
        assert_eq!(result.entities_created, 2);
        assert_eq!(result.relations_created, 1);
    }

    #[test]
    fn cycle_in_parent_update_is_rejected() {
        let (_dir, store) = store();
        store
            .with_mutation(|ctx| {
                ctx.append_entity(Entity::new("A", "t"))?;
                ctx.append_entity(Entity::new("B", "t"))?;
                ctx.update_entity("B", |e| e.parent_id = Some("A".to_string()))
            })
            .unwrap();

        let mut batch = TransactionBatch::new();
        batch.update_entity(
            "A",
            EntityChanges {
                parent_id: Some(Some("B".to_string())),
                ..Default::default()
            },
        );
        let result = batch.execute(&store, ExecuteOptions::default()).unwrap();
        assert!(!result.success);
    }
}
