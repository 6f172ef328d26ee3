//! `GraphManager`: the crate's public facade, wiring C1–C9 together the way
//! the teacher wires its leaf components into `SessionStore` /
//! `ContextBuilder` — a single owning struct built once at construction
//! ("context builder... leaves-first order", spec.md §9), not a lazily
//! reconstructed singleton.

use crate::atoms::error::{GraphError, GraphResult};
use crate::atoms::types::{Entity, KnowledgeGraph, Relation};
use crate::batch::{EntityChanges, ExecuteOptions, ExecutionResult, TransactionBatch};
use crate::cancellation::CancellationToken;
use crate::config::GraphConfig;
use crate::hierarchy;
use crate::search::{
    self, bm25_score, fuzzy_search, ranked_search, BasicSearchResult, EntityFilter, HybridWeights,
    Pagination, ProximityHit,
};
use crate::store::{Channel, EventEmitter, GraphStore, Listener, Subscription};
use crate::vector::{
    ensure_all_embedded, entity_text, semantic_search, EmbeddingProvider, FlushResult,
    InMemoryVectorStore, IncrementalIndexer, OpKind, VectorStore,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Owns the record log/cache (C1+C2), the vector store and incremental
/// indexer (C5), and exposes every read/write/search/batch/hierarchy
/// operation spec.md names as one cohesive API.
pub struct GraphManager {
    store: Arc<GraphStore>,
    vector_store: Arc<dyn VectorStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    indexer: Option<Arc<IncrementalIndexer>>,
}

impl GraphManager {
    /// Builds a manager over a JSONL log at `path`, with the default
    /// in-memory vector store and no embedding provider — semantic search
    /// and the incremental indexer are inert until [`Self::with_embedder`]
    /// attaches one.
    pub fn new(path: impl Into<PathBuf>, config: GraphConfig) -> Self {
        GraphManager {
            store: Arc::new(GraphStore::new(path, config, Arc::new(EventEmitter::new(false)))),
            vector_store: Arc::new(InMemoryVectorStore::new()),
            embedder: None,
            indexer: None,
        }
    }

    /// Attaches an embedding provider, standing up the incremental indexer
    /// (C5) on top of the current vector store.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.indexer = Some(Arc::new(IncrementalIndexer::new(
            self.vector_store.clone(),
            embedder.clone(),
        )));
        self.embedder = Some(embedder);
        self
    }

    /// Swaps in a different vector store (e.g. a persisted one), rebuilding
    /// the indexer against it if an embedder is already attached.
    pub fn with_vector_store(mut self, vector_store: Arc<dyn VectorStore>) -> Self {
        if let Some(embedder) = self.embedder.clone() {
            self.indexer = Some(Arc::new(IncrementalIndexer::new(vector_store.clone(), embedder)));
        }
        self.vector_store = vector_store;
        self
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventEmitter> {
        self.store.events()
    }

    pub fn subscribe(&self, channel: Channel, listener: Listener) -> Subscription {
        self.store.events().subscribe(channel, listener)
    }

    pub fn subscribe_all(&self, listener: Listener) -> Subscription {
        self.store.events().subscribe_wildcard(listener)
    }

    /// Returns a read-only snapshot of the cache (`load_graph` in spec.md
    /// §4.1 terms).
    pub fn graph(&self) -> GraphResult<KnowledgeGraph> {
        self.store.load_graph()
    }

    // ── Mutations ──────────────────────────────────────────────────────

    pub fn create_entity(&self, entity: Entity) -> GraphResult<Entity> {
        let created = self.store.with_mutation(|ctx| ctx.append_entity(entity))?;
        self.enqueue_embedding(OpKind::Create, &created);
        Ok(created)
    }

    pub fn create_relation(&self, relation: Relation) -> GraphResult<Relation> {
        self.store.with_mutation(|ctx| ctx.append_relation(relation))
    }

    pub fn update_entity(&self, name: &str, changes: EntityChanges) -> GraphResult<Entity> {
        let updated = self.store.with_mutation(|ctx| {
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
            })
        })?;
        self.enqueue_embedding(OpKind::Update, &updated);
        Ok(updated)
    }

    pub fn add_observations(&self, name: &str, observations: Vec<String>) -> GraphResult<Entity> {
        let updated = self.store.with_mutation(|ctx| ctx.add_observations(name, &observations))?;
        self.enqueue_embedding(OpKind::Update, &updated);
        Ok(updated)
    }

    pub fn delete_observations(&self, name: &str, observations: Vec<String>) -> GraphResult<Entity> {
        let updated = self.store.with_mutation(|ctx| ctx.delete_observations(name, &observations))?;
        self.enqueue_embedding(OpKind::Update, &updated);
        Ok(updated)
    }

    pub fn delete_entity(&self, name: &str) -> GraphResult<()> {
        self.store.with_mutation(|ctx| ctx.delete_entity(name))?;
        if let Some(indexer) = &self.indexer {
            indexer.enqueue(OpKind::Delete, name, None);
        } else {
            self.vector_store.remove(name);
        }
        Ok(())
    }

    pub fn delete_relation(&self, from: &str, to: &str, relation_type: &str) -> GraphResult<()> {
        self.store.with_mutation(|ctx| ctx.delete_relation(from, to, relation_type))
    }

    /// Queues the embedding op; if this push crosses the auto-flush size
    /// threshold, schedules a flush for the next tick (coalescing bursts)
    /// when a Tokio runtime is currently active — mirroring SPEC_FULL.md
    /// §4.5's "scheduled for next tick" auto-flush trigger without forcing
    /// every mutation call site to be `async`.
    fn enqueue_embedding(&self, kind: OpKind, entity: &Entity) {
        if let Some(indexer) = &self.indexer {
            let crossed_threshold = indexer.enqueue(kind, entity.name.clone(), Some(entity_text(entity)));
            if crossed_threshold {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    let indexer = indexer.clone();
                    handle.spawn(async move {
                        let _ = indexer.flush(None).await;
                    });
                }
            }
        }
    }

    /// Starts the periodic-interval auto-flush task (SPEC_FULL.md §4.5) on
    /// the current Tokio runtime. Returns `None` if no embedder is
    /// attached.
    pub fn start_auto_flush(&self) -> Option<tokio::task::JoinHandle<()>> {
        self.indexer.as_ref().map(|indexer| indexer.spawn_periodic_flush())
    }

    // ── Hierarchy (C8) ─────────────────────────────────────────────────

    pub fn set_entity_parent(&self, name: &str, parent: Option<&str>) -> GraphResult<Entity> {
        hierarchy::set_entity_parent(&self.store, name, parent)
    }

    pub fn get_parent(&self, name: &str) -> GraphResult<Option<Entity>> {
        let graph = self.graph()?;
        Ok(hierarchy::get_parent(&graph, name).cloned())
    }

    pub fn get_children(&self, name: &str) -> GraphResult<Vec<Entity>> {
        let graph = self.graph()?;
        Ok(hierarchy::get_children(&graph, name).into_iter().cloned().collect())
    }

    pub fn get_ancestors(&self, name: &str) -> GraphResult<Vec<Entity>> {
        let graph = self.graph()?;
        Ok(hierarchy::get_ancestors(&graph, name).into_iter().cloned().collect())
    }

    pub fn get_descendants(&self, name: &str) -> GraphResult<Vec<Entity>> {
        let graph = self.graph()?;
        Ok(hierarchy::get_descendants(&graph, name).into_iter().cloned().collect())
    }

    pub fn get_subtree(&self, name: &str) -> GraphResult<Option<(Vec<Entity>, Vec<Relation>)>> {
        let graph = self.graph()?;
        Ok(hierarchy::get_subtree(&graph, name)
            .map(|(entities, relations)| {
                (
                    entities.into_iter().cloned().collect(),
                    relations.into_iter().cloned().collect(),
                )
            }))
    }

    pub fn get_root_entities(&self) -> GraphResult<Vec<Entity>> {
        let graph = self.graph()?;
        Ok(hierarchy::get_root_entities(&graph).into_iter().cloned().collect())
    }

    pub fn get_entity_depth(&self, name: &str) -> GraphResult<Option<usize>> {
        let graph = self.graph()?;
        Ok(hierarchy::get_entity_depth(&graph, name))
    }

    // ── Lexical search (C4) ───────────────────────────────────────────

    pub fn search_basic(
        &self,
        query: &str,
        filter: &EntityFilter,
        pagination: &Pagination,
    ) -> GraphResult<BasicSearchResult> {
        let (graph, indices) = self.store.snapshot()?;
        Ok(search::basic_search(&graph, &indices, query, filter, pagination))
    }

    pub fn search_fuzzy(
        &self,
        query: &str,
        threshold: Option<f64>,
        filter: &EntityFilter,
        pagination: &Pagination,
    ) -> GraphResult<Vec<(Entity, f64)>> {
        let (graph, indices) = self.store.snapshot()?;
        let min_entities = self.store.config().fuzzy_worker_pool_min_entities;
        Ok(fuzzy_search(&graph, &indices, query, threshold, min_entities, filter, pagination))
    }

    pub fn search_boolean(&self, query: &str) -> GraphResult<Vec<Entity>> {
        let (graph, indices) = self.store.snapshot()?;
        let names = search::boolean_search(&graph, &indices, query)?;
        Ok(names.into_iter().filter_map(|name| graph.find_entity(&name).cloned()).collect())
    }

    pub fn search_proximity(
        &self,
        terms: &[String],
        max_distance: usize,
        filter: &EntityFilter,
        pagination: &Pagination,
    ) -> GraphResult<Vec<ProximityHit>> {
        let (graph, _indices) = self.store.snapshot()?;
        Ok(search::proximity_search(&graph, terms, max_distance, filter, pagination))
    }

    pub fn search_ranked(
        &self,
        query: &str,
        filter: &EntityFilter,
        pagination: &Pagination,
    ) -> GraphResult<Vec<(Entity, f64)>> {
        let (graph, indices) = self.store.snapshot()?;
        let ranked_default_limit = self.store.config().ranked_default_limit;
        Ok(ranked_search(&graph, &indices, query, filter, pagination, ranked_default_limit))
    }

    pub fn search_bm25(
        &self,
        query: &str,
        filter: &EntityFilter,
        pagination: &Pagination,
    ) -> GraphResult<Vec<(Entity, f64)>> {
        let (graph, indices) = self.store.snapshot()?;
        let ranked_default_limit = self.store.config().ranked_default_limit;
        Ok(bm25_score(&graph, &indices, query, filter, pagination, ranked_default_limit))
    }

    // ── Vector & hybrid search (C5, C6) ────────────────────────────────

    pub async fn search_semantic(
        &self,
        query: &str,
        limit: usize,
        min_similarity: f32,
        filter: &EntityFilter,
    ) -> GraphResult<Vec<(Entity, f32)>> {
        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| GraphError::MissingDependency {
                dependency: "embedding provider".to_string(),
            })?;
        let graph = self.graph()?;
        self.index_all().await?;
        semantic_search(&graph, self.vector_store.as_ref(), embedder.as_ref(), query, limit, min_similarity, filter)
            .await
    }

    /// Ensures every entity currently in the cache has a vector in the
    /// store, embedding whichever ones don't yet (§4.5 step (a)). A no-op
    /// without an attached embedder. Called up front by [`Self::search_semantic`]
    /// and [`Self::search_hybrid`] so a freshly created entity is visible to
    /// semantic search even before the incremental indexer's next flush.
    pub async fn index_all(&self) -> GraphResult<usize> {
        match &self.embedder {
            Some(embedder) => {
                let graph = self.graph()?;
                ensure_all_embedded(&graph, self.vector_store.as_ref(), embedder.as_ref()).await
            }
            None => Ok(0),
        }
    }

    /// Fuses semantic (vector), lexical (TF-IDF), and symbolic (exact
    /// name/type match) strategies under `weights`, each gathered to its
    /// own top-`max(limit, 20)` candidate pool first.
    pub async fn search_hybrid(
        &self,
        query: &str,
        weights: HybridWeights,
        filter: &EntityFilter,
        pagination: &Pagination,
    ) -> GraphResult<Vec<(Entity, f64)>> {
        if !weights.is_valid() {
            return Err(GraphError::InvalidQuery {
                reason: "hybrid weights must sum to a positive value".to_string(),
            });
        }
        let k = pagination.limit.max(crate::atoms::constants::HYBRID_MIN_CANDIDATE_POOL);
        let (graph, indices) = self.store.snapshot()?;

        let lexical_pool = Pagination { offset: 0, limit: k };
        // `k` (not `config.ranked_default_limit`) as the sentinel fallback: this
        // pool always wants exactly `k` candidates, regardless of whether `k`
        // happens to equal the plain-search default limit.
        let lexical: HashMap<String, f64> =
            ranked_search(&graph, &indices, query, &EntityFilter::default(), &lexical_pool, k)
                .into_iter()
                .map(|(e, s)| (e.name, s))
                .collect();

        let symbolic: HashMap<String, f64> = search::basic_search(
            &graph,
            &indices,
            query,
            &EntityFilter::default(),
            &lexical_pool,
        )
        .entities
        .into_iter()
        .map(|e| (e.name, 1.0))
        .collect();

        let semantic: HashMap<String, f64> = if let Some(embedder) = &self.embedder {
            self.index_all().await?;
            semantic_search(&graph, self.vector_store.as_ref(), embedder.as_ref(), query, k, 0.0, &EntityFilter::default())
                .await
                .unwrap_or_default()
                .into_iter()
                .map(|(e, s)| (e.name, s as f64))
                .collect()
        } else {
            HashMap::new()
        };

        Ok(search::hybrid_fuse(&graph, &semantic, &lexical, &symbolic, &weights, filter, pagination))
    }

    // ── Incremental indexer (C5) ──────────────────────────────────────

    pub async fn flush_index(&self, cancellation: Option<&CancellationToken>) -> GraphResult<FlushResult> {
        match &self.indexer {
            Some(indexer) => indexer.flush(cancellation).await,
            None => Ok(FlushResult::default()),
        }
    }

    pub async fn shutdown_index(&self) -> GraphResult<FlushResult> {
        match &self.indexer {
            Some(indexer) => indexer.shutdown().await,
            None => Ok(FlushResult::default()),
        }
    }

    pub fn index_queue_len(&self) -> usize {
        self.indexer.as_ref().map(|i| i.queue_len()).unwrap_or(0)
    }

    // ── Transaction batch (C7) ─────────────────────────────────────────

    pub fn execute_batch(&self, batch: &TransactionBatch, options: ExecuteOptions) -> GraphResult<ExecutionResult> {
        batch.execute(&self.store, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, GraphManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = GraphManager::new(dir.path().join("graph.jsonl"), GraphConfig::default());
        (dir, manager)
    }

    #[test]
    fn create_and_search_basic_round_trips() {
        let (_dir, manager) = manager();
        let mut entity = Entity::new("Alice", "person");
        entity.add_observation("loves pasta".to_string());
        manager.create_entity(entity).unwrap();

        let result = manager
            .search_basic("pasta", &EntityFilter::default(), &Pagination::default())
            .unwrap();
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "Alice");
    }

    #[test]
    fn hierarchy_round_trips_through_manager() {
        let (_dir, manager) = manager();
        manager.create_entity(Entity::new("root", "t")).unwrap();
        manager.create_entity(Entity::new("child", "t")).unwrap();
        manager.set_entity_parent("child", Some("root")).unwrap();

        let children = manager.get_children("root").unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "child");
    }

    #[test]
    fn batch_executes_through_manager() {
        let (_dir, manager) = manager();
        let mut batch = TransactionBatch::new();
        batch
            .create_entity(Entity::new("X", "person"))
            .create_entity(Entity::new("Y", "person"))
            .create_relation(Relation::new("X", "Y", "knows"));

        let result = manager.execute_batch(&batch, ExecuteOptions::default()).unwrap();
        assert!(result.success);
        assert_eq!(result.entities_created, 2);
    }
}
