//! Sliding-window similarity retrieval.
//!
//! The [`SimilarityRetriever`] turns an arbitrarily long text into the few
//! reference documents most relevant to it: the text is split into
//! token-budgeted windows, every window is embedded and searched on its own,
//! and the per-window matches are folded into one ranking by summed score.
//!
//! # Example
//!
//! ```rust,ignore
//! use rfq_rag::{RetrievalConfig, SimilarityRetriever, InMemoryVectorStore};
//!
//! let retriever = SimilarityRetriever::builder()
//!     .config(RetrievalConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .token_counter(Arc::new(counter))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let contexts = retriever.get_context_and_ifi("M10 hex nut, A4, DIN 934", 3).await?;
//! ```

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, error, info};

use crate::aggregate::aggregate;
use crate::config::RetrievalConfig;
use crate::document::{Match, RankedDocument, RetrievedContext, Window};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::tokens::TokenCounter;
use crate::vectorstore::VectorStore;
use crate::windowing::split_into_windows;

/// Retrieves reference documents for free text by sliding-window similarity.
///
/// Holds no per-call state, so one retriever can serve concurrent calls.
/// Construct one via [`SimilarityRetriever::builder()`].
pub struct SimilarityRetriever {
    config: RetrievalConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    token_counter: Arc<dyn TokenCounter>,
    vector_store: Arc<dyn VectorStore>,
}

impl SimilarityRetriever {
    /// Create a new [`SimilarityRetrieverBuilder`].
    pub fn builder() -> SimilarityRetrieverBuilder {
        SimilarityRetrieverBuilder::default()
    }

    /// Return a reference to the retrieval configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Return the `top_n` reference documents for `text` as
    /// `(content, identifier)` pairs, best first.
    ///
    /// Blank text returns an empty list without touching any collaborator.
    ///
    /// # Errors
    ///
    /// Fails if the token counter fails, or with [`RagError::WindowFailed`] if
    /// embedding or searching any window fails. No partial ranking is returned.
    pub async fn get_context_and_ifi(
        &self,
        text: &str,
        top_n: usize,
    ) -> Result<Vec<RetrievedContext>> {
        let ranked = self.rank(text, top_n).await?;
        Ok(ranked.into_iter().map(RetrievedContext::from).collect())
    }

    /// [`get_context_and_ifi`](Self::get_context_and_ifi) with the configured `top_n`.
    pub async fn retrieve(&self, text: &str) -> Result<Vec<RetrievedContext>> {
        self.get_context_and_ifi(text, self.config.top_n).await
    }

    /// Rank reference documents for `text`, keeping accumulated scores.
    ///
    /// `top_n` bounds both the matches requested per window and the length of
    /// the returned ranking. Blank text or a zero `top_n` returns an empty
    /// ranking without touching any collaborator.
    ///
    /// # Errors
    ///
    /// Same as [`get_context_and_ifi`](Self::get_context_and_ifi).
    pub async fn rank(&self, text: &str, top_n: usize) -> Result<Vec<RankedDocument>> {
        if text.trim().is_empty() {
            debug!("blank input, skipping retrieval");
            return Ok(Vec::new());
        }
        if top_n == 0 {
            debug!("top_n is zero, skipping retrieval");
            return Ok(Vec::new());
        }

        let windows = split_into_windows(
            text,
            self.config.window_size,
            self.config.stride,
            self.token_counter.as_ref(),
        )
        .await
        .inspect_err(|e| error!(error = %e, "failed to split input into windows"))?;

        // Results come back in window order whatever the concurrency, so the
        // fold below always sums in source order.
        let per_window: Vec<Vec<Match>> = stream::iter(windows.iter().enumerate())
            .map(|(index, window)| self.search_window(index, window, top_n))
            .buffered(self.config.max_concurrency.max(1))
            .try_collect()
            .await?;

        let ranked = aggregate(per_window, top_n)?;

        info!(
            windows = windows.len(),
            result_count = ranked.len(),
            documents = ?ranked.iter().map(|r| r.document_id.as_str()).collect::<Vec<_>>(),
            "retrieval completed"
        );

        Ok(ranked)
    }

    async fn search_window(
        &self,
        index: usize,
        window: &Window,
        top_n: usize,
    ) -> Result<Vec<Match>> {
        let embedding = self.embedding_provider.embed(&window.text).await.map_err(|e| {
            error!(window = index, start = window.start, error = %e, "window embedding failed");
            RagError::at_window(index, e)
        })?;

        let matches = self
            .vector_store
            .search(&self.config.collection, &embedding, top_n)
            .await
            .map_err(|e| {
                error!(
                    window = index,
                    collection = %self.config.collection,
                    error = %e,
                    "window search failed"
                );
                RagError::at_window(index, e)
            })?;

        debug!(
            window = index,
            start = window.start,
            match_count = matches.len(),
            "window searched"
        );
        Ok(matches)
    }
}

/// Builder for constructing a [`SimilarityRetriever`].
///
/// The embedding provider, token counter and vector store are required; the
/// configuration defaults to [`RetrievalConfig::default()`].
#[derive(Default)]
pub struct SimilarityRetrieverBuilder {
    config: Option<RetrievalConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    token_counter: Option<Arc<dyn TokenCounter>>,
    vector_store: Option<Arc<dyn VectorStore>>,
}

impl SimilarityRetrieverBuilder {
    /// Set the retrieval configuration.
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the token-counting oracle.
    pub fn token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    /// Set the similarity store.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Build the [`SimilarityRetriever`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required collaborator is missing.
    pub fn build(self) -> Result<SimilarityRetriever> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let token_counter = self
            .token_counter
            .ok_or_else(|| RagError::ConfigError("token_counter is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;

        Ok(SimilarityRetriever {
            config: self.config.unwrap_or_default(),
            embedding_provider,
            token_counter,
            vector_store,
        })
    }
}
