//! Error types for the `rfq-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval and ingestion.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The token-counting oracle failed or returned an unusable count.
    #[error("Token count error ({counter}): {message}")]
    TokenCountError {
        /// The token counter that produced the error.
        counter: String,
        /// A description of the failure.
        message: String,
    },

    /// A store result was missing its identifier or carried an unusable score.
    #[error("Malformed match: {0}")]
    MalformedMatch(String),

    /// Retrieval for one window failed; the whole call is aborted.
    #[error("Retrieval failed at window {index}: {source}")]
    WindowFailed {
        /// Zero-based index of the failing window in source order.
        index: usize,
        /// The collaborator error that aborted the call.
        #[source]
        source: Box<RagError>,
    },

    /// A reference identifier does not name a single file inside the library.
    #[error("Invalid reference identifier: {0:?}")]
    InvalidIdentifier(String),

    /// An error occurred while splitting reference text into chunks.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Reading reference files failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RagError {
    /// Wrap a collaborator error with the index of the window that produced it.
    pub fn at_window(index: usize, source: RagError) -> Self {
        RagError::WindowFailed { index, source: Box::new(source) }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
