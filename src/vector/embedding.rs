//! The embedding provider interface (consumed, not implemented) named in
//! SPEC_FULL.md §6 — the concrete HTTP client body is out of scope.

use crate::atoms::error::GraphResult;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct EmbeddingMetadata {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    PerItem,
    BatchOnly,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn is_ready(&self) -> bool;
    async fn embed(&self, text: &str) -> GraphResult<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> GraphResult<Vec<Vec<f32>>>;
    fn metadata(&self) -> EmbeddingMetadata;

    /// Default fallback: report progress after each completed batch.
    /// Providers that can stream per-item progress should override this.
    async fn embed_batch_with_progress(
        &self,
        texts: &[String],
        _mode: ProgressMode,
        on_progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> GraphResult<Vec<Vec<f32>>> {
        let result = self.embed_batch(texts).await?;
        on_progress(texts.len(), texts.len());
        Ok(result)
    }
}
