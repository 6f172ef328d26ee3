//! Semantic (vector) search (C5): embeds the query, overfetches from the
//! vector store, then filters and resolves back to entities.

use crate::atoms::constants::{SEMANTIC_OVERFETCH_FACTOR, SEMANTIC_TEXT_OBSERVATION_LIMIT};
use crate::atoms::error::GraphResult;
use crate::atoms::types::{Entity, KnowledgeGraph};
use crate::search::filter::EntityFilter;
use crate::vector::embedding::EmbeddingProvider;
use crate::vector::store::VectorStore;

/// `"{name} ({entityType})\n{first 10 observations joined by '. '}\nTags: …"`
pub fn entity_text(entity: &Entity) -> String {
    let observations = entity
        .observations
        .iter()
        .take(SEMANTIC_TEXT_OBSERVATION_LIMIT)
        .cloned()
        .collect::<Vec<_>>()
        .join(". ");
    let tags = entity.tags.iter().cloned().collect::<Vec<_>>().join(", ");
    format!("{} ({})\n{}\nTags: {}", entity.name, entity.entity_type, observations, tags)
}

/// Ensures every entity in `graph` has a vector in `vector_store`, embedding
/// and adding whichever ones don't (§4.5 step (a)). Used both as the
/// `index_all` entry point and as an up-front pass before a semantic search,
/// so a freshly created entity is searchable even before the incremental
/// indexer's next flush.
pub async fn ensure_all_embedded(
    graph: &KnowledgeGraph,
    vector_store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
) -> GraphResult<usize> {
    let mut embedded = 0;
    for entity in &graph.entities {
        if vector_store.has(&entity.name) {
            continue;
        }
        let vector = embedder.embed(&entity_text(entity)).await?;
        vector_store.add(&entity.name, vector);
        embedded += 1;
    }
    Ok(embedded)
}

pub async fn semantic_search(
    graph: &KnowledgeGraph,
    vector_store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    query: &str,
    limit: usize,
    min_similarity: f32,
    filter: &EntityFilter,
) -> GraphResult<Vec<(Entity, f32)>> {
    let query_vector = embedder.embed(query).await?;
    let overfetched = vector_store.search(&query_vector, limit * SEMANTIC_OVERFETCH_FACTOR);

    let mut results = Vec::new();
    for (name, score) in overfetched {
        if score < min_similarity {
            continue;
        }
        let Some(entity) = graph.find_entity(&name) else {
            continue;
        };
        if !filter.matches(entity) {
            continue;
        }
        results.push((entity.clone(), score));
        if results.len() >= limit {
            break;
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::embedding::EmbeddingMetadata;
    use crate::vector::store::InMemoryVectorStore;
    use async_trait::async_trait;

    #[test]
    fn entity_text_includes_name_type_observations_tags() {
        let mut e = Entity::new("Alice", "person");
        e.add_observation("loves pasta".to_string());
        e.tags.insert("friend".to_string());
        let text = entity_text(&e);
        assert!(text.starts_with("Alice (person)"));
        assert!(text.contains("loves pasta"));
        assert!(text.contains("Tags: friend"));
    }

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn is_ready(&self) -> bool {
            true
        }
        async fn embed(&self, text: &str) -> GraphResult<Vec<f32>> {
            Ok(vec![text.len() as f32])
        }
        async fn embed_batch(&self, texts: &[String]) -> GraphResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
        fn metadata(&self) -> EmbeddingMetadata {
            EmbeddingMetadata {
                provider: "fake".to_string(),
                model: "fake-1".to_string(),
                dimensions: 1,
            }
        }
    }

    #[tokio::test]
    async fn ensure_all_embedded_skips_already_indexed_entities() {
        let mut graph = KnowledgeGraph::new();
        graph.entities.push(Entity::new("A", "person"));
        graph.entities.push(Entity::new("B", "person"));

        let store = InMemoryVectorStore::new();
        store.add("A", vec![1.0]);

        let embedded = ensure_all_embedded(&graph, &store, &FakeEmbedder).await.unwrap();
        assert_eq!(embedded, 1);
        assert!(store.has("A"));
        assert!(store.has("B"));
    }
}
