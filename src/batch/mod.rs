//! The transaction batch (C7): ordered, pre-validated multi-operation
//! commits over a single mutation window.

pub mod transaction;

pub use transaction::{
    BatchOperation, EntityChanges, ExecuteOptions, ExecutionResult, TransactionBatch,
};
