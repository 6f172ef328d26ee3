//! `engram-graph`: an embeddable knowledge-graph engine for agentic
//! applications.
//!
//! The crate stores a labelled, typed property graph — entities with
//! ordered observations, tags, importance, and an optional hierarchy
//! parent, plus directed typed relations between them — in a single
//! append-only log backed by an authoritative in-memory cache. On top of
//! that store it exposes exact/filtered lookup, the lexical search family
//! (basic, fuzzy, boolean, proximity, ranked), optional vector-similarity
//! search, and a hybrid fusion across all three, plus transactional
//! multi-operation batches and parent/child hierarchy traversal.
//!
//! [`GraphManager`] is the entry point most callers want: it wires the
//! record log (C1), index set (C2), search dispatcher (C3/C4/C6), vector
//! store and incremental indexer (C5), transaction batch (C7), hierarchy
//! primitives (C8), and event emitter (C9) into one handle.

pub mod atoms;
pub mod batch;
pub mod cancellation;
pub mod config;
pub mod hierarchy;
pub mod index;
pub mod manager;
pub mod search;
pub mod store;
pub mod vector;
pub mod worker_pool;

pub use atoms::{Entity, GraphError, GraphResult, KnowledgeGraph, Record, Relation};
pub use batch::{BatchOperation, EntityChanges, ExecuteOptions, ExecutionResult, TransactionBatch};
pub use cancellation::CancellationToken;
pub use config::{GraphConfig, StorageType};
pub use index::Indices;
pub use manager::GraphManager;
pub use store::{Channel, EventEmitter, GraphEvent, GraphStore, Listener, MutationContext, Subscription};
