//! Hierarchy & traversal primitives (C8): parent/child navigation over the
//! `parentId` name-keyed foreign key on [`crate::atoms::types::Entity`].
//! Grounded on the teacher's `atoms::engram_types::EdgeType` pattern — edges
//! (here, parent pointers) are encoded by name, never by owning reference,
//! so the cycle check below walks via name lookup rather than pointer
//! topology, per spec.md §9's cyclic-parent-chain design note.

use crate::atoms::error::{GraphError, GraphResult};
use crate::atoms::types::{Entity, KnowledgeGraph, Relation};
use crate::store::GraphStore;
use chrono::Utc;
use std::collections::{HashSet, VecDeque};

/// Walks up the parent chain from `start_parent`, returning whether `name`
/// would be reachable — i.e. whether setting `name`'s parent to
/// `start_parent` closes a cycle. Self-parenting is always a cycle.
fn would_create_cycle(graph: &KnowledgeGraph, name: &str, start_parent: &str) -> bool {
    if name == start_parent {
        return true;
    }
    let mut visited = HashSet::new();
    let mut current = Some(start_parent.to_string());
    while let Some(node) = current {
        if node == name || !visited.insert(node.clone()) {
            return true;
        }
        current = graph
            .find_entity(&node)
            .and_then(|e| e.parent_id.clone());
    }
    false
}

/// Validates both endpoints, checks for a cycle, then updates `parentId`
/// and `lastModified` atomically through the mutation mutex. `parent =
/// None` detaches the entity, making it a root.
pub fn set_entity_parent(store: &GraphStore, name: &str, parent: Option<&str>) -> GraphResult<Entity> {
    store.with_mutation(|ctx| {
        if !ctx.graph.has_entity(name) {
            return Err(GraphError::entity_not_found(name));
        }
        if let Some(parent_name) = parent {
            if !ctx.graph.has_entity(parent_name) {
                return Err(GraphError::entity_not_found(parent_name));
            }
            if would_create_cycle(ctx.graph, name, parent_name) {
                return Err(GraphError::cycle_detected(name, parent_name));
            }
        }
        let parent_owned = parent.map(|p| p.to_string());
        ctx.update_entity(name, move |entity| {
            entity.parent_id = parent_owned;
        })
    })
}

/// Entities that are orphan roots (no `parentId`, or a `parentId` that
/// resolves to nothing) are tolerated at read time, per spec.md §3.
pub fn get_parent<'a>(graph: &'a KnowledgeGraph, name: &str) -> Option<&'a Entity> {
    graph
        .find_entity(name)
        .and_then(|e| e.parent_id.as_deref())
        .and_then(|parent_name| graph.find_entity(parent_name))
}

pub fn get_children<'a>(graph: &'a KnowledgeGraph, name: &str) -> Vec<&'a Entity> {
    graph
        .entities
        .iter()
        .filter(|e| e.parent_id.as_deref() == Some(name))
        .collect()
}

/// Walk up from `name`, root last. Stops on a missing or already-visited
/// parent name (orphan parent, or — defensively — a cycle that slipped past
/// `set_entity_parent`) rather than looping forever.
pub fn get_ancestors<'a>(graph: &'a KnowledgeGraph, name: &str) -> Vec<&'a Entity> {
    let mut ancestors = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(name.to_string());

    let mut current = graph.find_entity(name).and_then(|e| e.parent_id.clone());
    while let Some(parent_name) = current {
        if !visited.insert(parent_name.clone()) {
            break;
        }
        let Some(parent_entity) = graph.find_entity(&parent_name) else {
            break;
        };
        ancestors.push(parent_entity);
        current = parent_entity.parent_id.clone();
    }
    ancestors
}

/// Breadth-first descendants of `name`, nearest generation first.
pub fn get_descendants<'a>(graph: &'a KnowledgeGraph, name: &str) -> Vec<&'a Entity> {
    let mut descendants = Vec::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(name);
    let mut visited = HashSet::new();
    visited.insert(name.to_string());

    while let Some(current) = queue.pop_front() {
        for child in get_children(graph, current) {
            if visited.insert(child.name.clone()) {
                descendants.push(child);
                queue.push_back(&child.name);
            }
        }
    }
    descendants
}

/// `name` plus all its descendants, and the relations whose endpoints both
/// lie within that set.
pub fn get_subtree<'a>(graph: &'a KnowledgeGraph, name: &str) -> Option<(Vec<&'a Entity>, Vec<&'a Relation>)> {
    let root = graph.find_entity(name)?;
    let mut entities = vec![root];
    entities.extend(get_descendants(graph, name));

    let names: HashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    let relations: Vec<&Relation> = graph
        .relations
        .iter()
        .filter(|r| names.contains(r.from.as_str()) && names.contains(r.to.as_str()))
        .collect();
    Some((entities, relations))
}

/// Entities with no parent, or whose `parentId` resolves to nothing
/// (orphan roots are tolerated, not auto-repaired, per spec.md §4.8).
pub fn get_root_entities(graph: &KnowledgeGraph) -> Vec<&Entity> {
    graph
        .entities
        .iter()
        .filter(|e| match &e.parent_id {
            None => true,
            Some(parent_name) => !graph.has_entity(parent_name),
        })
        .collect()
}

/// Depth from the nearest root: `0` for a root entity, `None` if `name`
/// does not exist.
pub fn get_entity_depth(graph: &KnowledgeGraph, name: &str) -> Option<usize> {
    graph.find_entity(name)?;
    Some(get_ancestors(graph, name).len())
}

/// Touches `lastModified` on an entity without otherwise changing it —
/// used nowhere in this module directly, kept here since it's a hierarchy-
/// adjacent helper for callers that detach a child after deleting a parent.
#[allow(dead_code)]
pub fn touch_last_modified(entity: &mut Entity) {
    entity.last_modified = Some(Utc::now());
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
    fn cycle_through_grandparent_is_rejected() {
        let (_dir, store) = store();
        store
            .with_mutation(|ctx| {
                ctx.append_entity(Entity::new("A", "t"))?;
                ctx.append_entity(Entity::new("B", "t"))?;
                ctx.append_entity(Entity::new("C", "t"))?;
                Ok(())
            })
            .unwrap();
        set_entity_parent(&store, "A", Some("B")).unwrap();
        set_entity_parent(&store, "B", Some("C")).unwrap();

        let result = set_entity_parent(&store, "C", Some("A"));
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));

        let graph = store.load_graph().unwrap();
        assert_eq!(graph.find_entity("C").unwrap().parent_id, None);
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let (_dir, store) = store();
        store
            .with_mutation(|ctx| ctx.append_entity(Entity::new("A", "t")))
            .unwrap();
        let result = set_entity_parent(&store, "A", Some("A"));
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
    }

    #[test]
    fn ancestors_root_last_and_descendants_breadth_first() {
        let (_dir, store) = store();
        store
            .with_mutation(|ctx| {
                ctx.append_entity(Entity::new("root", "t"))?;
                ctx.append_entity(Entity::new("mid", "t"))?;
                ctx.append_entity(Entity::new("leaf", "t"))?;
                Ok(())
            })
            .unwrap();
        set_entity_parent(&store, "mid", Some("root")).unwrap();
        set_entity_parent(&store, "leaf", Some("mid")).unwrap();

        let graph = store.load_graph().unwrap();
        let ancestors = get_ancestors(&graph, "leaf");
        let names: Vec<&str> = ancestors.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["mid", "root"]);

        let descendants = get_descendants(&graph, "root");
        let names: Vec<&str> = descendants.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["mid", "leaf"]);

        assert_eq!(get_entity_depth(&graph, "root"), Some(0));
        assert_eq!(get_entity_depth(&graph, "leaf"), Some(2));
    }

    #[test]
    fn orphan_parent_reads_as_root() {
        let (_dir, store) = store();
        store
            .with_mutation(|ctx| {
                let mut e = Entity::new("A", "t");
                e.parent_id = Some("ghost".to_string());
                ctx.append_entity(e)
            })
            .unwrap();
        let graph = store.load_graph().unwrap();
        let roots = get_root_entities(&graph);
        assert!(roots.iter().any(|e| e.name == "A"));
    }
}
