//! Environment-driven configuration, modelled on the teacher's
//! `EngramConfig`: a plain `Default`-implementing struct, overridable at
//! construction and from the process environment.

use crate::atoms::constants::*;
use crate::atoms::error::{GraphError, GraphResult};
use std::time::Duration;

/// Which on-disk storage backend to use. Only `Jsonl` is implemented; `Sqlite`
/// is recognised so configuration round-trips cleanly but is rejected with
/// `UnsupportedFeature` at construction (see SPEC_FULL.md §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Jsonl,
    Sqlite,
}

impl StorageType {
    fn parse(raw: &str) -> GraphResult<Self> {
        match raw {
            "jsonl" => Ok(StorageType::Jsonl),
            "sqlite" => Ok(StorageType::Sqlite),
            other => Err(GraphError::InvalidConfig {
                reason: format!("MEMORY_STORAGE_TYPE must be jsonl or sqlite, got '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub storage_type: StorageType,
    /// Opaque passthrough; the core never reads it, only forwards it.
    pub embedding_provider: Option<String>,

    pub pagination_min_limit: usize,
    pub pagination_max_limit: usize,
    pub pagination_default_limit: usize,

    pub compaction_threshold: u64,

    pub fuzzy_default_threshold: f64,
    pub fuzzy_worker_pool_min_entities: usize,

    pub ranked_default_limit: usize,

    pub semantic_min_similarity: f32,

    pub indexer_auto_flush_queue_size: usize,
    pub indexer_auto_flush_interval: Duration,

    pub hybrid_semantic_weight: f64,
    pub hybrid_lexical_weight: f64,
    pub hybrid_symbolic_weight: f64,

    /// Decay/salience/context knobs are accepted and stored verbatim for
    /// forwarding to agent-memory modules; the core does not interpret them.
    pub agent_memory_opaque: std::collections::HashMap<String, String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            storage_type: StorageType::Jsonl,
            embedding_provider: None,
            pagination_min_limit: PAGINATION_MIN_LIMIT,
            pagination_max_limit: PAGINATION_MAX_LIMIT,
            pagination_default_limit: PAGINATION_DEFAULT_LIMIT,
            compaction_threshold: COMPACTION_THRESHOLD,
            fuzzy_default_threshold: FUZZY_DEFAULT_THRESHOLD,
            fuzzy_worker_pool_min_entities: FUZZY_WORKER_POOL_MIN_ENTITIES,
            ranked_default_limit: RANKED_DEFAULT_LIMIT,
            semantic_min_similarity: SEMANTIC_MIN_SIMILARITY_DEFAULT,
            indexer_auto_flush_queue_size: INDEXER_AUTO_FLUSH_QUEUE_SIZE,
            indexer_auto_flush_interval: Duration::from_secs(INDEXER_AUTO_FLUSH_INTERVAL_SECS),
            hybrid_semantic_weight: HYBRID_DEFAULT_SEMANTIC_WEIGHT,
            hybrid_lexical_weight: HYBRID_DEFAULT_LEXICAL_WEIGHT,
            hybrid_symbolic_weight: HYBRID_DEFAULT_SYMBOLIC_WEIGHT,
            agent_memory_opaque: std::collections::HashMap::new(),
        }
    }
}

impl GraphConfig {
    /// Reads recognised environment variables (SPEC_FULL.md §6), falling
    /// back to defaults for anything unset.
    pub fn from_env() -> GraphResult<Self> {
        let mut config = GraphConfig::default();

        if let Ok(raw) = std::env::var("MEMORY_STORAGE_TYPE") {
            config.storage_type = StorageType::parse(&raw)?;
        }
        if config.storage_type == StorageType::Sqlite {
            return Err(GraphError::UnsupportedFeature {
                feature: "sqlite storage backend".to_string(),
            });
        }

        if let Ok(provider) = std::env::var("MEMORY_EMBEDDING_PROVIDER") {
            config.embedding_provider = Some(provider);
        }

        if let Ok(raw) = std::env::var("SEARCH_LIMITS.MIN") {
            config.pagination_min_limit = parse_usize(&raw, "SEARCH_LIMITS.MIN")?;
        }
        if let Ok(raw) = std::env::var("SEARCH_LIMITS.MAX") {
            config.pagination_max_limit = parse_usize(&raw, "SEARCH_LIMITS.MAX")?;
        }
        if let Ok(raw) = std::env::var("SEARCH_LIMITS.DEFAULT") {
            config.pagination_default_limit = parse_usize(&raw, "SEARCH_LIMITS.DEFAULT")?;
        }

        for (key, value) in std::env::vars() {
            if let Some(suffix) = key.strip_prefix("MEMORY_DECAY_") {
                config
                    .agent_memory_opaque
                    .insert(format!("decay.{}", suffix.to_lowercase()), value);
            } else if let Some(suffix) = key.strip_prefix("MEMORY_SALIENCE_") {
                config
                    .agent_memory_opaque
                    .insert(format!("salience.{}", suffix.to_lowercase()), value);
            } else if let Some(suffix) = key.strip_prefix("MEMORY_CONTEXT_") {
                config
                    .agent_memory_opaque
                    .insert(format!("context.{}", suffix.to_lowercase()), value);
            }
        }

        Ok(config)
    }
}

fn parse_usize(raw: &str, var_name: &str) -> GraphResult<usize> {
    raw.parse::<usize>().map_err(|_| GraphError::InvalidConfig {
        reason: format!("{var_name} must be a non-negative integer, got '{raw}'"),
    })
}
