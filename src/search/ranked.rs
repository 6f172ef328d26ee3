//! Ranked search (C4): TF-IDF scoring over the union of inverted-index
//! postings for the query's tokens, with an opt-in BM25 alternative over
//! the same postings (SPEC_FULL.md §9's resolution of the BM25-vs-TF-IDF
//! open question).

use crate::atoms::constants::PAGINATION_DEFAULT_LIMIT;
use crate::atoms::types::{Entity, KnowledgeGraph};
use crate::index::{tokenize, Indices};
use crate::search::filter::{EntityFilter, Pagination};
use std::collections::{BTreeSet, HashMap};

fn searchable_text(entity: &Entity) -> String {
    let mut parts = vec![entity.name.clone(), entity.entity_type.clone()];
    parts.extend(entity.tags.iter().cloned());
    parts.extend(entity.observations.iter().cloned());
    parts.join(" ")
}

fn term_frequencies(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

fn candidate_names(indices: &Indices, query_tokens: &[String]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for token in query_tokens {
        names.extend(indices.observation.postings_for(token));
    }
    names
}

/// `score = Σ_t tf(t, d) · idf(t)`, `idf = log((N+1)/(df+1)) + 1`.
///
/// `ranked_default_limit` is `GraphConfig::ranked_default_limit` (10 by
/// default, §4.4) — substituted for `pagination`'s limit when the caller
/// passed the plain-search default (50), since ranked search has its own,
/// smaller default page size.
pub fn ranked_search(
    graph: &KnowledgeGraph,
    indices: &Indices,
    query: &str,
    filter: &EntityFilter,
    pagination: &Pagination,
    ranked_default_limit: usize,
) -> Vec<(Entity, f64)> {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let candidates = candidate_names(indices, &query_tokens);
    let mut scored: Vec<(Entity, f64)> = Vec::new();

    for name in candidates {
        let Some(entity) = graph.find_entity(&name) else {
            continue;
        };
        if !filter.matches(entity) {
            continue;
        }
        let tf = term_frequencies(&searchable_text(entity));
        let score: f64 = query_tokens
            .iter()
            .map(|t| *tf.get(t).unwrap_or(&0) as f64 * indices.observation.idf(t))
            .sum();
        if score > 0.0 {
            scored.push((entity.clone(), score));
        }
    }

    scored.sort_by(|(ea, sa), (eb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ea.name.cmp(&eb.name))
    });

    pagination_apply_scored(scored, pagination, ranked_default_limit)
}

fn pagination_apply_scored(
    scored: Vec<(Entity, f64)>,
    pagination: &Pagination,
    ranked_default_limit: usize,
) -> Vec<(Entity, f64)> {
    let limit = if pagination.limit == PAGINATION_DEFAULT_LIMIT {
        ranked_default_limit
    } else {
        pagination.limit
    };
    scored
        .into_iter()
        .skip(pagination.offset)
        .take(limit)
        .collect()
}

/// Okapi BM25 with the conventional `k1 = 1.2`, `b = 0.75`, computed over
/// the same postings and document set as [`ranked_search`].
pub fn bm25_score(
    graph: &KnowledgeGraph,
    indices: &Indices,
    query: &str,
    filter: &EntityFilter,
    pagination: &Pagination,
    ranked_default_limit: usize,
) -> Vec<(Entity, f64)> {
    const K1: f64 = 1.2;
    const B: f64 = 0.75;

    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let candidates = candidate_names(indices, &query_tokens);
    let doc_lengths: Vec<usize> = graph
        .entities
        .iter()
        .map(|e| tokenize(&searchable_text(e)).len())
        .collect();
    let avg_len = if doc_lengths.is_empty() {
        0.0
    } else {
        doc_lengths.iter().sum::<usize>() as f64 / doc_lengths.len() as f64
    };

    let mut scored: Vec<(Entity, f64)> = Vec::new();
    for name in candidates {
        let Some(entity) = graph.find_entity(&name) else {
            continue;
        };
        if !filter.matches(entity) {
            continue;
        }
        let text = searchable_text(entity);
        let tf = term_frequencies(&text);
        let doc_len = tokenize(&text).len() as f64;

        let score: f64 = query_tokens
            .iter()
            .map(|t| {
                let f = *tf.get(t).unwrap_or(&0) as f64;
                if f == 0.0 {
                    return 0.0;
                }
                let idf = indices.observation.idf(t);
                let denom = f + K1 * (1.0 - B + B * doc_len / avg_len.max(1.0));
                idf * (f * (K1 + 1.0)) / denom
            })
            .sum();

        if score > 0.0 {
            scored.push((entity.clone(), score));
        }
    }

    scored.sort_by(|(ea, sa), (eb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ea.name.cmp(&eb.name))
    });
    pagination_apply_scored(scored, pagination, ranked_default_limit)
}
