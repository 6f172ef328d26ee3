//! Basic search (C4): case-insensitive substring/prefix match against name,
//! type, tag, or observation.

use crate::atoms::types::{Entity, KnowledgeGraph, Relation};
use crate::index::{tokenize, Indices};
use crate::search::filter::{EntityFilter, Pagination};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchKind {
    Name = 0,
    Type = 1,
    Tag = 2,
    Observation = 3,
}

pub struct BasicSearchResult {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

pub fn basic_search(
    graph: &KnowledgeGraph,
    indices: &Indices,
    query: &str,
    filter: &EntityFilter,
    pagination: &Pagination,
) -> BasicSearchResult {
    let query_lower = query.to_lowercase();
    let single_word = tokenize(query).len() <= 1 && !query_lower.contains(' ');

    let mut hits: Vec<(MatchKind, &Entity)> = Vec::new();

    // The inverted index only has whole-token postings, so it's a fast path
    // for a query that happens to be an exact token — a partial token (e.g.
    // "pas" against "pasta") has no postings and falls back to a full scan,
    // same as any multi-word query, so prefix/substring matches still work.
    let candidate_names: Option<Vec<String>> = if single_word && !query_lower.is_empty() {
        let postings: Vec<String> = indices.observation.postings_for(&query_lower).into_iter().collect();
        if postings.is_empty() {
            None
        } else {
            Some(postings)
        }
    } else {
        None
    };

    let candidates: Vec<&Entity> = match &candidate_names {
        Some(names) => names
            .iter()
            .filter_map(|name| graph.find_entity(name))
            .collect(),
        None => graph.entities.iter().collect(),
    };

    for entity in candidates {
        if !filter.matches(entity) {
            continue;
        }
        let Some(lower) = indices.lowercase.get(&entity.name) else {
            continue;
        };

        if lower.name_lower.contains(&query_lower) {
            hits.push((MatchKind::Name, entity));
        } else if lower.type_lower.contains(&query_lower) {
            hits.push((MatchKind::Type, entity));
        } else if lower.tags_lower.iter().any(|t| t.contains(&query_lower)) {
            hits.push((MatchKind::Tag, entity));
        } else if lower
            .observations_lower
            .iter()
            .any(|o| o.contains(&query_lower))
        {
            hits.push((MatchKind::Observation, entity));
        }
    }

    hits.sort_by(|(ka, ea), (kb, eb)| ka.cmp(kb).then_with(|| ea.name.cmp(&eb.name)));

    let entities: Vec<Entity> = hits.into_iter().map(|(_, e)| e.clone()).collect();
    let entities = pagination.apply(&entities);

    let result_names: std::collections::HashSet<&str> =
        entities.iter().map(|e| e.name.as_str()).collect();
    let relations: Vec<Relation> = graph
        .relations
        .iter()
        .filter(|r| result_names.contains(r.from.as_str()) && result_names.contains(r.to.as_str()))
        .cloned()
        .collect();

    BasicSearchResult { entities, relations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Indices;

    fn sample_graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        let mut a = Entity::new("A", "person");
        a.add_observation("loves pasta".to_string());
        let mut b = Entity::new("B", "person");
        b.add_observation("manages A".to_string());
        graph.entities.push(a);
        graph.entities.push(b);
        graph.relations.push(Relation::new("B", "A", "manages"));
        graph
    }

    #[test]
    fn substring_on_observation_finds_entity() {
        let graph = sample_graph();
        let mut indices = Indices::default();
        indices.rebuild(&graph);
        let result = basic_search(
            &graph,
            &indices,
            "pasta",
            &EntityFilter::default(),
            &Pagination::default(),
        );
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "A");
    }

    #[test]
    fn partial_token_substring_falls_back_to_full_scan() {
        let graph = sample_graph();
        let mut indices = Indices::default();
        indices.rebuild(&graph);

        let by_type_prefix = basic_search(&graph, &indices, "per", &EntityFilter::default(), &Pagination::default());
        assert_eq!(by_type_prefix.entities.len(), 2);

        let by_observation_substring =
            basic_search(&graph, &indices, "pas", &EntityFilter::default(), &Pagination::default());
        assert_eq!(by_observation_substring.entities.len(), 1);
        assert_eq!(by_observation_substring.entities[0].name, "A");
    }
}
