//! Fuzzy search (C4): Levenshtein-distance similarity over names and
//! observations, dispatched across the worker pool for large graphs.

use crate::atoms::constants::FUZZY_DEFAULT_THRESHOLD;
use crate::atoms::types::{Entity, KnowledgeGraph};
use crate::index::Indices;
use crate::search::filter::{EntityFilter, Pagination};
use crate::worker_pool::{self, FUZZY_SEARCH_POOL};

/// Dynamic-programming edit distance (insert = delete = substitute = 1).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr = vec![0usize; m + 1];

    for i in 1..=n {
        curr[0] = i;
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

/// `1.0` if `query` is shorter than `candidate` and `candidate` contains it
/// verbatim; otherwise `1 - distance / max(|a|, |b|)`.
pub fn similarity(query: &str, candidate: &str) -> f64 {
    if query.len() < candidate.len() && candidate.contains(query) {
        return 1.0;
    }
    let max_len = query.chars().count().max(candidate.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(query, candidate) as f64 / max_len as f64)
}

fn best_score_for_entity(entity: &Entity, query_lower: &str, lower_name: &str, lower_obs: &[String]) -> f64 {
    let mut best = similarity(query_lower, lower_name);
    for obs in lower_obs {
        let score = similarity(query_lower, obs);
        if score > best {
            best = score;
        }
    }
    let _ = entity;
    best
}

pub fn fuzzy_search(
    graph: &KnowledgeGraph,
    indices: &Indices,
    query: &str,
    threshold: Option<f64>,
    worker_pool_min_entities: usize,
    filter: &EntityFilter,
    pagination: &Pagination,
) -> Vec<(Entity, f64)> {
    let threshold = threshold.unwrap_or(FUZZY_DEFAULT_THRESHOLD);
    let query_lower = query.to_lowercase();

    let candidates: Vec<&Entity> = graph
        .entities
        .iter()
        .filter(|e| filter.matches(e))
        .collect();

    let scores: Vec<f64> = if candidates.len() >= worker_pool_min_entities {
        worker_pool::map_parallel(FUZZY_SEARCH_POOL, &candidates, |entity| {
            score_entity(entity, indices, &query_lower)
        })
    } else {
        candidates
            .iter()
            .map(|entity| score_entity(entity, indices, &query_lower))
            .collect()
    };

    let mut scored: Vec<(Entity, f64)> = candidates
        .into_iter()
        .zip(scores)
        .filter(|(_, score)| *score >= threshold)
        .map(|(e, score)| (e.clone(), score))
        .collect();

    scored.sort_by(|(ea, sa), (eb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ea.name.cmp(&eb.name))
    });

    let names_only: Vec<Entity> = scored.iter().map(|(e, _)| e.clone()).collect();
    let paged = pagination.apply(&names_only);
    let paged_names: std::collections::HashSet<&str> =
        paged.iter().map(|e| e.name.as_str()).collect();
    scored
        .into_iter()
        .filter(|(e, _)| paged_names.contains(e.name.as_str()))
        .collect()
}

fn score_entity(entity: &Entity, indices: &Indices, query_lower: &str) -> f64 {
    match indices.lowercase.get(&entity.name) {
        Some(lower) => best_score_for_entity(entity, query_lower, &lower.name_lower, &lower.observations_lower),
        None => similarity(query_lower, &entity.name.to_lowercase()),
    }
}
