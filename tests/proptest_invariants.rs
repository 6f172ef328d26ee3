//! Property tests over arbitrary create/update/delete sequences, grounded
//! on `harborgrid-justin-caddy`'s proptest dev-dependency usage. Checks the
//! universal invariants SPEC_FULL.md calls out: a store reloaded from its
//! own log replays to the same graph, and the index set stays consistent
//! with the cache after any sequence of mutations.

use engram_graph::atoms::types::Entity;
use engram_graph::search::{basic_search, EntityFilter, Pagination};
use engram_graph::{GraphConfig, GraphManager};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Create(String),
    AddObservation(usize, String),
    Delete(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z]{3,8}".prop_map(Op::Create),
        (0usize..8, "[a-z]{3,8}").prop_map(|(i, o)| Op::AddObservation(i, o)),
        (0usize..8).prop_map(Op::Delete),
    ]
}

/// Applies `ops` against `names` (the set of entity names created so far,
/// in creation order) and returns the resulting name set, mirroring what
/// the store itself should end up holding.
fn apply(manager: &GraphManager, names: &mut Vec<String>, op: &Op) {
    match op {
        Op::Create(name) => {
            if names.contains(name) {
                return;
            }
            if manager.create_entity(Entity::new(name.clone(), "thing")).is_ok() {
                names.push(name.clone());
            }
        }
        Op::AddObservation(idx, text) => {
            if let Some(name) = names.get(*idx) {
                let _ = manager.add_observations(name, vec![text.clone()]);
            }
        }
        Op::Delete(idx) => {
            if let Some(name) = names.get(*idx).cloned() {
                if manager.delete_entity(&name).is_ok() {
                    names.retain(|n| n != &name);
                }
            }
        }
    }
}

proptest! {
    /// A store reloaded fresh from its own log file always holds exactly
    /// the entities the in-memory manager believes it created.
    #[test]
    fn replay_matches_live_cache(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.jsonl");
        let manager = GraphManager::new(&path, GraphConfig::default());

        let mut names = Vec::new();
        for op in &ops {
            apply(&manager, &mut names, op);
        }

        let live = manager.graph().unwrap();
        let mut live_names: Vec<String> = live.entities.iter().map(|e| e.name.clone()).collect();
        live_names.sort();

        let reloaded = GraphManager::new(&path, GraphConfig::default());
        let replayed = reloaded.graph().unwrap();
        let mut replayed_names: Vec<String> = replayed.entities.iter().map(|e| e.name.clone()).collect();
        replayed_names.sort();

        prop_assert_eq!(live_names, replayed_names);
    }

    /// After any sequence of mutations, a basic search for an observation
    /// word finds exactly the entities that currently carry it — the
    /// observation index never drifts from the cache it was built from.
    #[test]
    fn observation_index_matches_cache(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let dir = tempfile::tempdir().unwrap();
        let manager = GraphManager::new(dir.path().join("graph.jsonl"), GraphConfig::default());

        let mut names = Vec::new();
        for op in &ops {
            apply(&manager, &mut names, op);
        }

        let graph = manager.graph().unwrap();
        for entity in &graph.entities {
            for observation in &entity.observations {
                let word = observation.split_whitespace().next().unwrap_or(observation);
                let result = basic_search(
                    &graph,
                    &{
                        let mut indices = engram_graph::Indices::default();
                        indices.rebuild(&graph);
                        indices
                    },
                    word,
                    &EntityFilter::default(),
                    &Pagination { offset: 0, limit: graph.entities.len().max(1) },
                );
                prop_assert!(result.entities.iter().any(|e| e.name == entity.name));
            }
        }
    }
}
