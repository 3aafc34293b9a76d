//! In-memory similarity store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a store backed by a
//! `HashMap` of row lists protected by a `tokio::sync::RwLock`. It scores
//! rows exactly like the pgvector backend (`1 - cosine_distance`) and is
//! suitable for development, testing and offline runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Match, ReferenceChunk};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// An in-memory similarity store.
///
/// Collections map a name to the rows inserted into it, in insertion order.
/// Rows sharing a `document_id` are kept side by side, as in the SQL table.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<ReferenceChunk>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(collection: &str) -> RagError {
        RagError::VectorStoreError {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

/// Cosine similarity between two vectors, `1 - cosine_distance`.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn insert(&self, collection: &str, chunks: &[ReferenceChunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let rows = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        rows.extend_from_slice(chunks);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<Match>> {
        let collections = self.collections.read().await;
        let rows = collections.get(collection).ok_or_else(|| Self::missing(collection))?;

        let mut scored: Vec<Match> = rows
            .iter()
            .map(|row| Match {
                content: row.content.clone(),
                document_id: row.document_id.clone(),
                score: cosine_similarity(&row.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, content: &str, embedding: Vec<f32>) -> ReferenceChunk {
        ReferenceChunk { document_id: id.into(), content: content.into(), embedding }
    }

    #[test]
    fn cosine_similarity_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn search_keeps_rows_sharing_an_identifier() {
        let store = InMemoryVectorStore::new();
        store.create_collection("documents", 2).await.unwrap();
        store
            .insert(
                "documents",
                &[
                    row("IFI_1", "part a", vec![1.0, 0.0]),
                    row("IFI_1", "part b", vec![0.9, 0.1]),
                    row("IFI_2", "other", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let matches = store.search("documents", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].content, "part a");
        assert_eq!(matches[1].content, "part b");
        assert!(matches.iter().all(|m| m.document_id == "IFI_1"));
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(!store.collection_exists("documents").await.unwrap());
        let err = store.search("documents", &[1.0], 3).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
    }
}
