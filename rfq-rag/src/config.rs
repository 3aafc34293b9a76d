//! Configuration for retrieval and reference ingestion.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::windowing::{DEFAULT_STRIDE, DEFAULT_WINDOW_SIZE};

/// Configuration parameters for [`SimilarityRetriever`](crate::SimilarityRetriever).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Maximum tokens per window.
    pub window_size: usize,
    /// Tokens advanced between consecutive windows.
    pub stride: usize,
    /// Matches requested per window, and length of the final ranking.
    pub top_n: usize,
    /// Name of the store collection holding reference rows.
    pub collection: String,
    /// How many windows may be embedded and queried at the same time.
    pub max_concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            stride: DEFAULT_STRIDE,
            top_n: 3,
            collection: "documents".to_string(),
            max_concurrency: 1,
        }
    }
}

impl RetrievalConfig {
    /// Create a new builder for constructing a [`RetrievalConfig`].
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    /// Set the maximum tokens per window.
    pub fn window_size(mut self, tokens: usize) -> Self {
        self.config.window_size = tokens;
        self
    }

    /// Set the token stride between windows.
    pub fn stride(mut self, tokens: usize) -> Self {
        self.config.stride = tokens;
        self
    }

    /// Set the number of results requested per window and returned overall.
    pub fn top_n(mut self, n: usize) -> Self {
        self.config.top_n = n;
        self
    }

    /// Set the store collection to search.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set how many windows may be in flight at once.
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.max_concurrency = n;
        self
    }

    /// Build the [`RetrievalConfig`], validating that parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `window_size == 0` or `stride == 0`
    /// - `top_n == 0`
    /// - `max_concurrency == 0`
    /// - `collection` is empty
    pub fn build(self) -> Result<RetrievalConfig> {
        if self.config.window_size == 0 {
            return Err(RagError::ConfigError("window_size must be greater than zero".to_string()));
        }
        if self.config.stride == 0 {
            return Err(RagError::ConfigError("stride must be greater than zero".to_string()));
        }
        if self.config.top_n == 0 {
            return Err(RagError::ConfigError("top_n must be greater than zero".to_string()));
        }
        if self.config.max_concurrency == 0 {
            return Err(RagError::ConfigError(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.config.collection.trim().is_empty() {
            return Err(RagError::ConfigError("collection must not be empty".to_string()));
        }
        Ok(self.config)
    }
}

/// Configuration parameters for [`ReferenceIngestor`](crate::ReferenceIngestor).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks sent per embedding request.
    pub batch_size: usize,
    /// Name of the store collection to fill.
    pub collection: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 1000,
            batch_size: 32,
            collection: "documents".to_string(),
        }
    }
}

impl IngestConfig {
    /// Create a new builder for constructing an [`IngestConfig`].
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`IngestConfig`].
#[derive(Debug, Clone, Default)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks embedded per request.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the store collection to fill.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Build the [`IngestConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_overlap >= chunk_size`,
    /// `batch_size == 0` or the collection name is empty.
    pub fn build(self) -> Result<IngestConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
        }
        if self.config.collection.trim().is_empty() {
            return Err(RagError::ConfigError("collection must not be empty".to_string()));
        }
        Ok(self.config)
    }
}
