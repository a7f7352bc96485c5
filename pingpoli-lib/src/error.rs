//! Error types for PingPoli

use thiserror::Error;

/// Result type alias for PingPoli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in PingPoli operations
#[derive(Error, Debug)]
pub enum Error {
    /// A record was rejected at insert time
    #[error("invalid record: {0}")]
    Validation(String),

    /// Query and stored embeddings have different dimensionality
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A source unit could not be read during ingestion
    #[error("ingestion error: {source_id}: {reason}")]
    Ingestion { source_id: String, reason: String },

    /// Failed to load or run the embedding model
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The completion service failed or returned garbage
    #[error("completion error: {0}")]
    Completion(String),

    /// Failed to read from or write to the vector store
    #[error("store error: {0}")]
    Store(String),

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for failures reported by the embedding or completion service.
    ///
    /// These are surfaced verbatim and never retried here; callers own the
    /// retry policy.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Completion(_))
    }

    pub(crate) fn ingestion(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Ingestion {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }
}
