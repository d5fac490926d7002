use thiserror::Error;

use crate::records::types::{Category, FormId};

/// Raised by the checked body accessors on [`Record`](crate::records::Record).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The record's body variant is not the one the caller asked for.
    #[error("{category} record {form_id} holds a {found} body, expected {expected}")]
    BodyMismatch {
        form_id: FormId,
        category: Category,
        expected: &'static str,
        found: &'static str,
    },
}

/// Structural invariant violations on a package record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PackageError {
    #[error("procedure tree has no root branch")]
    MissingRoot,

    #[error("table lengths disagree: {slots} slots, {descriptors} descriptors, count {count}")]
    TableLengthMismatch {
        slots: usize,
        descriptors: usize,
        count: u32,
    },

    #[error("watermark {watermark} does not follow highest slot index (expected {expected})")]
    WatermarkMismatch { watermark: u32, expected: u32 },

    #[error("root branch declares {declared} children but {actual} top-level nodes exist")]
    ChildCountMismatch { declared: u32, actual: usize },
}

/// Errors that can arise while loading, saving or importing record containers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// JSON container dumps.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, dump files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a container or record that is not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Every object id of the container is taken.
    #[error("no free object ids left in container {container}")]
    IdSpaceExhausted { container: String },

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },
}
