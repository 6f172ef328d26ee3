//! Hybrid fusion (C6): a linear combination of per-strategy scores under
//! configurable weights, generalised from the teacher's
//! `engine/engram/hybrid_search.rs::weighted_rrf_fuse` (reciprocal-rank
//! fusion swapped for the weighted-sum fusion SPEC_FULL.md §4.6 specifies).

use crate::atoms::types::{Entity, KnowledgeGraph};
use crate::search::filter::{EntityFilter, Pagination};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy)]
pub struct HybridWeights {
    pub semantic: f64,
    pub lexical: f64,
    pub symbolic: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        use crate::atoms::constants::{
            HYBRID_DEFAULT_LEXICAL_WEIGHT, HYBRID_DEFAULT_SEMANTIC_WEIGHT, HYBRID_DEFAULT_SYMBOLIC_WEIGHT,
        };
        HybridWeights {
            semantic: HYBRID_DEFAULT_SEMANTIC_WEIGHT,
            lexical: HYBRID_DEFAULT_LEXICAL_WEIGHT,
            symbolic: HYBRID_DEFAULT_SYMBOLIC_WEIGHT,
        }
    }
}

impl HybridWeights {
    pub fn is_valid(&self) -> bool {
        self.semantic + self.lexical + self.symbolic > 0.0
    }
}

/// Divides every score by the strategy's top score (or leaves it unchanged
/// if the top score is zero), projecting into `[0, 1]`.
fn normalize(scores: &HashMap<String, f64>) -> HashMap<String, f64> {
    let top = scores.values().cloned().fold(0.0_f64, f64::max);
    if top <= 0.0 {
        return scores.clone();
    }
    scores.iter().map(|(k, v)| (k.clone(), v / top)).collect()
}

/// Fuses three independently-gathered candidate score maps (semantic,
/// lexical, symbolic — each already limited to its own top-K) into one
/// ranked, filtered, paginated result set. An entity missing from a
/// strategy counts as 0 for that strategy.
pub fn fuse(
    graph: &KnowledgeGraph,
    semantic: &HashMap<String, f64>,
    lexical: &HashMap<String, f64>,
    symbolic: &HashMap<String, f64>,
    weights: &HybridWeights,
    filter: &EntityFilter,
    pagination: &Pagination,
) -> Vec<(Entity, f64)> {
    let semantic = normalize(semantic);
    let lexical = normalize(lexical);
    let symbolic = normalize(symbolic);

    let mut candidates: HashSet<&String> = HashSet::new();
    candidates.extend(semantic.keys());
    candidates.extend(lexical.keys());
    candidates.extend(symbolic.keys());

    let mut scored: Vec<(Entity, f64)> = Vec::new();
    for name in candidates {
        let Some(entity) = graph.find_entity(name) else {
            continue;
        };
        if !filter.matches(entity) {
            continue;
        }
        let score = weights.semantic * semantic.get(name).copied().unwrap_or(0.0)
            + weights.lexical * lexical.get(name).copied().unwrap_or(0.0)
            + weights.symbolic * symbolic.get(name).copied().unwrap_or(0.0);
        scored.push((entity.clone(), score));
    }

    scored.sort_by(|(ea, sa), (eb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ea.name.cmp(&eb.name))
    });

    scored
        .into_iter()
        .skip(pagination.offset)
        .take(pagination.limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::Entity;

    #[test]
    fn missing_strategy_counts_as_zero() {
        let mut graph = KnowledgeGraph::new();
        graph.entities.push(Entity::new("A", "person"));
        graph.entities.push(Entity::new("B", "person"));

        let semantic = HashMap::from([("A".to_string(), 1.0)]);
        let lexical = HashMap::from([("B".to_string(), 1.0)]);
        let symbolic = HashMap::new();

        let results = fuse(
            &graph,
            &semantic,
            &lexical,
            &symbolic,
            &HybridWeights::default(),
            &EntityFilter::default(),
            &Pagination::default(),
        );
        assert_eq!(results.len(), 2);
        // semantic weight (0.5) > lexical weight (0.3), so A outranks B.
        assert_eq!(results[0].0.name, "A");
    }
}
