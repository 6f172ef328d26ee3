//! Proximity search (C4): entities whose name or an observation contains
//! every query term within a maximum token distance of one another.

use crate::atoms::types::{Entity, KnowledgeGraph};
use crate::index::tokenize;
use crate::search::filter::{EntityFilter, Pagination};

#[derive(Debug, Clone)]
pub struct MatchLocation {
    pub field: String,
    pub term_positions: Vec<usize>,
    pub distance: usize,
}

#[derive(Debug, Clone)]
pub struct ProximityHit {
    pub entity: Entity,
    pub score: f64,
    pub locations: Vec<MatchLocation>,
}

/// Finds the minimal-span window containing at least one occurrence of
/// every term list (classic k-way "smallest range" problem), returning
/// `(span, chosen_position_per_term)`.
fn smallest_span(position_lists: &[Vec<usize>]) -> Option<(usize, Vec<usize>)> {
    let k = position_lists.len();
    if k == 0 || position_lists.iter().any(|l| l.is_empty()) {
        return None;
    }

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (idx, list) in position_lists.iter().enumerate() {
        for &pos in list {
            merged.push((pos, idx));
        }
    }
    merged.sort_by_key(|&(pos, _)| pos);

    let mut count = vec![0usize; k];
    let mut have = 0usize;
    let mut left = 0usize;
    let mut best: Option<(usize, usize, usize)> = None;

    for right in 0..merged.len() {
        let (pos_r, idx_r) = merged[right];
        if count[idx_r] == 0 {
            have += 1;
        }
        count[idx_r] += 1;

        while have == k {
            let (pos_l, idx_l) = merged[left];
            let span = pos_r - pos_l;
            if best.map(|(b, _, _)| span < b).unwrap_or(true) {
                best = Some((span, pos_l, pos_r));
            }
            count[idx_l] -= 1;
            if count[idx_l] == 0 {
                have -= 1;
            }
            left += 1;
        }
    }

    best.map(|(span, lo, hi)| {
        let mut chosen = vec![usize::MAX; k];
        for &(pos, idx) in &merged {
            if pos >= lo && pos <= hi && chosen[idx] == usize::MAX {
                chosen[idx] = pos;
            }
        }
        (span, chosen)
    })
}

fn positions_of(tokens: &[String], term_lower: &str) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.as_str() == term_lower)
        .map(|(i, _)| i)
        .collect()
}

pub fn proximity_search(
    graph: &KnowledgeGraph,
    terms: &[String],
    max_distance: usize,
    filter: &EntityFilter,
    pagination: &Pagination,
) -> Vec<ProximityHit> {
    let terms_lower: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();

    let mut hits: Vec<ProximityHit> = Vec::new();
    for entity in &graph.entities {
        if !filter.matches(entity) {
            continue;
        }

        let mut fields: Vec<(String, Vec<String>)> = vec![("name".to_string(), tokenize(&entity.name))];
        for (i, obs) in entity.observations.iter().enumerate() {
            fields.push((format!("observation[{i}]"), tokenize(obs)));
        }

        let mut best_location: Option<MatchLocation> = None;
        for (field_name, tokens) in &fields {
            let lists: Vec<Vec<usize>> = terms_lower
                .iter()
                .map(|term| positions_of(tokens, term))
                .collect();
            if let Some((span, chosen)) = smallest_span(&lists) {
                if span <= max_distance {
                    let better = best_location
                        .as_ref()
                        .map(|loc| span < loc.distance)
                        .unwrap_or(true);
                    if better {
                        best_location = Some(MatchLocation {
                            field: field_name.clone(),
                            term_positions: chosen,
                            distance: span,
                        });
                    }
                }
            }
        }

        if let Some(location) = best_location {
            let score = 1.0 / (1.0 + location.distance as f64);
            hits.push(ProximityHit {
                entity: entity.clone(),
                score,
                locations: vec![location],
            });
        }
    }

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity.name.cmp(&b.entity.name))
    });

    let entities_only: Vec<Entity> = hits.iter().map(|h| h.entity.clone()).collect();
    let paged = pagination.apply(&entities_only);
    let paged_names: std::collections::HashSet<&str> = paged.iter().map(|e| e.name.as_str()).collect();
    hits.into_iter()
        .filter(|h| paged_names.contains(h.entity.name.as_str()))
        .collect()
}
