//! Tunable defaults. Every constant here has a corresponding field on
//! [`crate::config::GraphConfig`] that can override it at construction time.

// ── Pagination (§4.3) ──
pub const PAGINATION_MIN_LIMIT: usize = 1;
pub const PAGINATION_MAX_LIMIT: usize = 1000;
pub const PAGINATION_DEFAULT_LIMIT: usize = 50;

// ── Compaction (§4.1) ──
/// Appended-record count after which the next mutation triggers an implicit
/// compact.
pub const COMPACTION_THRESHOLD: u64 = 1000;

// ── Fuzzy search (§4.4) ──
pub const FUZZY_DEFAULT_THRESHOLD: f64 = 0.7;
/// Entity count above which the Levenshtein scan is dispatched across the
/// worker pool instead of running inline.
pub const FUZZY_WORKER_POOL_MIN_ENTITIES: usize = 200;

// ── Ranked search (§4.4) ──
pub const RANKED_DEFAULT_LIMIT: usize = 10;

// ── Vector search (§4.5) ──
pub const SEMANTIC_MIN_SIMILARITY_DEFAULT: f32 = 0.0;
pub const SEMANTIC_OVERFETCH_FACTOR: usize = 2;
pub const SEMANTIC_TEXT_OBSERVATION_LIMIT: usize = 10;

// ── Incremental indexer (§4.5) ──
pub const INDEXER_AUTO_FLUSH_QUEUE_SIZE: usize = 50;
pub const INDEXER_AUTO_FLUSH_INTERVAL_SECS: u64 = 5;

// ── Hybrid fusion (§4.6) ──
pub const HYBRID_DEFAULT_SEMANTIC_WEIGHT: f64 = 0.5;
pub const HYBRID_DEFAULT_LEXICAL_WEIGHT: f64 = 0.3;
pub const HYBRID_DEFAULT_SYMBOLIC_WEIGHT: f64 = 0.2;
pub const HYBRID_MIN_CANDIDATE_POOL: usize = 20;

// ── Observation tokenisation (§4.2) ──
/// Tokens shorter than this are dropped from the inverted index.
pub const TOKEN_MIN_LENGTH: usize = 2;
