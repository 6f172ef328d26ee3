//! The error taxonomy shared by every component in the crate.

use thiserror::Error;

/// The narrowest applicable error for every fallible public operation.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("entity not found: {name}")]
    EntityNotFound { name: String },

    #[error("entity already exists: {name}")]
    DuplicateEntity { name: String },

    #[error("relation not found: ({from}, {to}, {relation_type})")]
    RelationNotFound {
        from: String,
        to: String,
        relation_type: String,
    },

    #[error("setting parent of '{name}' to '{parent}' would create a cycle")]
    CycleDetected { name: String, parent: String },

    #[error("importance must be within [0, 10], got {value}")]
    InvalidImportance { value: f64 },

    #[error("validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("schema validation failed: {reason}")]
    SchemaValidationFailed { reason: String },

    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("search failed: {reason}")]
    SearchFailed { reason: String },

    #[error("index not ready: {index}")]
    IndexNotReady { index: String },

    #[error("embedding failed: {reason}")]
    EmbeddingFailed { reason: String },

    #[error("storage read failed: {reason}")]
    StorageRead { reason: String },

    #[error("storage write failed: {reason}")]
    StorageWrite { reason: String },

    #[error("storage corrupted: {reason}")]
    StorageCorrupted { reason: String },

    #[error("import failed: {reason}")]
    ImportFailed { reason: String },

    #[error("export failed: {reason}")]
    ExportFailed { reason: String },

    #[error("file operation failed: {reason}")]
    FileOperation { reason: String },

    #[error("operation cancelled: {op_name}")]
    OperationCancelled { op_name: String },

    #[error("unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },

    #[error("missing dependency: {dependency}")]
    MissingDependency { dependency: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("insufficient entities: need {needed}, have {have}")]
    InsufficientEntities { needed: usize, have: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    pub fn entity_not_found(name: impl Into<String>) -> Self {
        GraphError::EntityNotFound { name: name.into() }
    }

    pub fn duplicate_entity(name: impl Into<String>) -> Self {
        GraphError::DuplicateEntity { name: name.into() }
    }

    pub fn relation_not_found(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        GraphError::RelationNotFound {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        }
    }

    pub fn cycle_detected(name: impl Into<String>, parent: impl Into<String>) -> Self {
        GraphError::CycleDetected {
            name: name.into(),
            parent: parent.into(),
        }
    }

    pub fn validation_failed(reason: impl Into<String>) -> Self {
        GraphError::ValidationFailed {
            reason: reason.into(),
        }
    }

    pub fn invalid_query(reason: impl Into<String>) -> Self {
        GraphError::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// A short user-facing suggestion for this error kind, keyed by variant
    /// rather than by instance data. Consumed by a hypothetical CLI layer;
    /// nothing in this crate reads it back.
    pub fn hint(&self) -> &'static str {
        match self {
            GraphError::EntityNotFound { .. } => "check the entity name with list_all or search",
            GraphError::DuplicateEntity { .. } => "use update_entity instead of create_entity",
            GraphError::RelationNotFound { .. } => "both endpoints and relationType must match exactly",
            GraphError::CycleDetected { .. } => "choose a parent that is not a descendant of this entity",
            GraphError::InvalidImportance { .. } => "importance must be between 0.0 and 10.0",
            GraphError::ValidationFailed { .. } => "inspect the reason and adjust the request",
            GraphError::SchemaValidationFailed { .. } => "the payload does not match the expected shape",
            GraphError::InvalidQuery { .. } => "check operator precedence and quoting in the query",
            GraphError::SearchFailed { .. } => "retry with a narrower query or check the logs",
            GraphError::IndexNotReady { .. } => "call load_graph before issuing searches",
            GraphError::EmbeddingFailed { .. } => "check the embedding provider's availability",
            GraphError::StorageRead { .. } => "verify the log file is readable and not locked",
            GraphError::StorageWrite { .. } => "verify disk space and directory permissions",
            GraphError::StorageCorrupted { .. } => "inspect the log file for malformed lines",
            GraphError::ImportFailed { .. } => "check the import file's format",
            GraphError::ExportFailed { .. } => "check the destination path is writable",
            GraphError::FileOperation { .. } => "check file permissions and paths",
            GraphError::OperationCancelled { .. } => "the operation was cancelled by its token",
            GraphError::UnsupportedFeature { .. } => "this feature is not implemented in this build",
            GraphError::MissingDependency { .. } => "install or configure the missing dependency",
            GraphError::InvalidConfig { .. } => "check environment variable values",
            GraphError::InsufficientEntities { .. } => "add more entities before running this operation",
            GraphError::Io(_) => "check underlying filesystem access",
            GraphError::Json(_) => "check the JSON payload's shape",
        }
    }
}
