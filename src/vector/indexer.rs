//! The incremental indexer (C5's hard sub-engine): a queue of
//! create/update/delete operations, coalesced by entity and flushed in
//! batches against the abstract vector store. Generalised from the
//! teacher's `engine/engram/consolidation.rs` batch/flush/cancellation
//! loop shape, swapped from consolidation operations to embedding ones.

use crate::atoms::constants::{INDEXER_AUTO_FLUSH_INTERVAL_SECS, INDEXER_AUTO_FLUSH_QUEUE_SIZE};
use crate::atoms::error::GraphResult;
use crate::cancellation::{check_cancellation, CancellationToken};
use crate::vector::embedding::EmbeddingProvider;
use crate::vector::store::VectorStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub struct QueuedOp {
    pub kind: OpKind,
    pub entity_name: String,
    pub text: Option<String>,
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct FlushResult {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

pub struct IncrementalIndexer {
    queue: Mutex<Vec<QueuedOp>>,
    flushing: AtomicBool,
    closed: AtomicBool,
    auto_flush_queue_size: usize,
    auto_flush_interval: Duration,
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IncrementalIndexer {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        IncrementalIndexer {
            queue: Mutex::new(Vec::new()),
            flushing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            auto_flush_queue_size: INDEXER_AUTO_FLUSH_QUEUE_SIZE,
            auto_flush_interval: Duration::from_secs(INDEXER_AUTO_FLUSH_INTERVAL_SECS),
            vector_store,
            embedder,
        }
    }

    pub fn with_thresholds(mut self, auto_flush_queue_size: usize, auto_flush_interval: Duration) -> Self {
        self.auto_flush_queue_size = auto_flush_queue_size;
        self.auto_flush_interval = auto_flush_interval;
        self
    }

    /// Queues an operation. At most one pending op per entity is kept: a
    /// later op supersedes the earlier one, except `create` arriving after
    /// a pending `update` keeps the update's text (SPEC_FULL.md §4.5).
    /// Returns whether the queue just crossed the auto-flush size threshold.
    pub fn enqueue(&self, kind: OpKind, entity_name: impl Into<String>, text: Option<String>) -> bool {
        let entity_name = entity_name.into();
        let mut queue = self.queue.lock();

        if let Some(existing) = queue.iter_mut().find(|op| op.entity_name == entity_name) {
            let keep_existing_text = existing.kind == OpKind::Update && kind == OpKind::Create;
            existing.kind = kind;
            if !keep_existing_text {
                existing.text = text;
            }
            existing.queued_at = Utc::now();
        } else {
            queue.push(QueuedOp {
                kind,
                entity_name,
                text,
                queued_at: Utc::now(),
            });
        }
        queue.len() >= self.auto_flush_queue_size
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn auto_flush_interval(&self) -> Duration {
        self.auto_flush_interval
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Processes all queued ops in one batched call. If a flush is already
    /// in progress, returns an empty result immediately and leaves the
    /// queue to accumulate for the next idle flush.
    pub async fn flush(&self, cancellation: Option<&CancellationToken>) -> GraphResult<FlushResult> {
        if self.flushing.swap(true, Ordering::SeqCst) {
            return Ok(FlushResult::default());
        }
        let result = self.flush_inner(cancellation).await;
        self.flushing.store(false, Ordering::SeqCst);
        result
    }

    async fn flush_inner(&self, cancellation: Option<&CancellationToken>) -> GraphResult<FlushResult> {
        let start = std::time::Instant::now();
        let ops: Vec<QueuedOp> = std::mem::take(&mut *self.queue.lock());
        if ops.is_empty() {
            return Ok(FlushResult::default());
        }

        if let Some(token) = cancellation {
            check_cancellation(token, "indexer.flush")?;
        }

        let (deletes, upserts): (Vec<_>, Vec<_>) =
            ops.into_iter().partition(|op| op.kind == OpKind::Delete);

        for op in &deletes {
            self.vector_store.remove(&op.entity_name);
        }

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut errors = Vec::new();

        if !upserts.is_empty() {
            let texts: Vec<String> = upserts.iter().map(|op| op.text.clone().unwrap_or_default()).collect();
            match self.embedder.embed_batch(&texts).await {
                Ok(vectors) if vectors.len() == upserts.len() => {
                    for (op, vector) in upserts.iter().zip(vectors) {
                        self.vector_store.add(&op.entity_name, vector);
                        succeeded += 1;
                    }
                }
                _ => {
                    if let Some(token) = cancellation {
                        check_cancellation(token, "indexer.flush.fallback")?;
                    }
                    for op in &upserts {
                        let text = op.text.clone().unwrap_or_default();
                        match self.embedder.embed(&text).await {
                            Ok(vector) => {
                                self.vector_store.add(&op.entity_name, vector);
                                succeeded += 1;
                            }
                            Err(err) => {
                                failed += 1;
                                errors.push(format!("{}: {err}", op.entity_name));
                            }
                        }
                    }
                }
            }
        }

        Ok(FlushResult {
            processed: deletes.len() + upserts.len(),
            succeeded: succeeded + deletes.len(),
            failed,
            errors,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Drains pending ops in one final flush, then rejects further enqueues.
    pub async fn shutdown(&self) -> GraphResult<FlushResult> {
        self.closed.store(true, Ordering::SeqCst);
        self.flush(None).await
    }

    /// Spawns the periodic-interval auto-flush trigger (SPEC_FULL.md §4.5)
    /// on the current Tokio runtime, ticking every `auto_flush_interval`
    /// until [`Self::shutdown`] marks the indexer closed.
    pub fn spawn_periodic_flush(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let indexer = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(indexer.auto_flush_interval);
            loop {
                ticker.tick().await;
                if indexer.is_closed() {
                    break;
                }
                if let Err(err) = indexer.flush(None).await {
                    log::warn!("periodic index flush failed: {err}");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::store::InMemoryVectorStore;
    use async_trait::async_trait;

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
        fn metadata(&self) -> crate::vector::embedding::EmbeddingMetadata {
            crate::vector::embedding::EmbeddingMetadata {
                provider: "fake".to_string(),
                model: "fake-1".to_string(),
                dimensions: 1,
            }
        }
    }

    #[tokio::test]
    async fn create_then_update_keeps_update_text() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = IncrementalIndexer::new(store.clone(), Arc::new(FakeEmbedder));

        indexer.enqueue(OpKind::Create, "E1", Some("t1".to_string()));
        indexer.enqueue(OpKind::Update, "E1", Some("t2".to_string()));
        indexer.enqueue(OpKind::Delete, "E2", None);

        let result = indexer.flush(None).await.unwrap();
        assert_eq!(result.processed, 2);
        assert!(store.has("E1"));
        assert!(!store.has("E2"));
        assert_eq!(store.get("E1").unwrap(), vec!["t2".len() as f32]);
    }

    #[tokio::test]
    async fn reentrant_flush_returns_empty_and_keeps_queue() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = Arc::new(IncrementalIndexer::new(store, Arc::new(FakeEmbedder)));
        indexer.enqueue(OpKind::Create, "E1", Some("t1".to_string()));
        indexer.flushing.store(true, Ordering::SeqCst);

        let result = indexer.flush(None).await.unwrap();
        assert_eq!(result.processed, 0);
        assert_eq!(indexer.queue_len(), 1);
    }
}
