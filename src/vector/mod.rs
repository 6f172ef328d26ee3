//! Vector search and the incremental indexer (C5).

pub mod embedding;
pub mod indexer;
pub mod semantic;
pub mod store;

pub use embedding::{EmbeddingMetadata, EmbeddingProvider, ProgressMode};
pub use indexer::{FlushResult, IncrementalIndexer, OpKind, QueuedOp};
pub use semantic::{ensure_all_embedded, entity_text, semantic_search};
pub use store::{cosine_similarity, InMemoryVectorStore, VectorStore};
