//! Error types for the kokkai-rag workflow engine
//!
//! Library code returns `RagError` everywhere; `anyhow` is reserved for the
//! binary boundary in `main.rs`.

use thiserror::Error;

/// Main error type for the RAG workflow system
#[derive(Error, Debug)]
pub enum RagError {
    /// State machine transition errors
    #[error("Invalid state transition from {from:?} to {to:?}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Corpus loading errors
    #[error("Corpus error: {0}")]
    CorpusError(String),

    /// Request validation errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Ollama API errors
    #[error("Ollama API error: {0}")]
    OllamaApiError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Unexpected workflow failures
    #[error("Workflow error: {0}")]
    Workflow(String),
}

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Convert anyhow errors to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Workflow(err.to_string())
    }
}
