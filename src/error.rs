// Error types for the local store

use thiserror::Error;

/// Convenience alias used throughout the store
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by store operations
///
/// The store never retries or swallows a failure; every variant reaches the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened or the connection is unusable.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An operation required an existing record and found none.
    #[error("{collection} record not found: {id}")]
    NotFound { collection: &'static str, id: String },

    /// A create collided with an existing record.
    #[error("{collection} record already exists: {id}")]
    Conflict { collection: &'static str, id: String },

    /// A collection or index is missing, or the stored schema is unsupported.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A record, id or patch does not match the expected shape.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Any other SQLite failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn not_found(collection: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }

    pub fn conflict(collection: &'static str, id: impl Into<String>) -> Self {
        Self::Conflict {
            collection,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidRecord(err.to_string())
    }
}
