//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Retrieval embeds one window at a time through [`embed`](EmbeddingProvider::embed);
/// ingestion uses [`embed_batch`](EmbeddingProvider::embed_batch), whose default
/// implementation calls `embed` sequentially. Backends that support native
/// batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use rfq_rag::EmbeddingProvider;
///
/// let embedding = provider.embed("DIN 933 M10 x 40 8.8 zinc").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}
