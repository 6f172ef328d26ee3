//! Shared primitives: data model, error taxonomy, and tunable constants.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{GraphError, GraphResult};
pub use types::{Entity, KnowledgeGraph, Record, Relation};
