//! Similarity store trait for storing reference rows and searching them by vector.

use async_trait::async_trait;

use crate::document::{Match, ReferenceChunk};
use crate::error::Result;

/// A storage backend for reference embeddings with similarity search.
///
/// Scores are `1 - cosine_distance` between the stored embedding and the
/// query vector. Retrieval only ever calls [`search`](VectorStore::search);
/// the other methods exist for ingestion.
///
/// # Example
///
/// ```rust,ignore
/// use rfq_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("documents", 3072).await?;
/// store.insert("documents", &chunks).await?;
/// let matches = store.search("documents", &query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Return whether the named collection exists.
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Delete a named collection and all its rows. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Append rows to a collection. Rows must have embeddings set.
    async fn insert(&self, collection: &str, chunks: &[ReferenceChunk]) -> Result<()>;

    /// Return at most `limit` rows most similar to `embedding`,
    /// ordered by descending score.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<Match>>;
}
