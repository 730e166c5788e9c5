//! Error types for store operations.

/// Errors returned by the persona and learning log stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// No entry with the requested id.
    #[error("not found: {0}")]
    NotFound(String),
}
