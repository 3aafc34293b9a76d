//! Reference ingestion.
//!
//! The [`ReferenceIngestor`] fills the similarity store from a
//! [`ReferenceLibrary`]: each file is chunked, the chunks are embedded in
//! batches, and every row is stored under the file's identifier.
//!
//! # Example
//!
//! ```rust,ignore
//! use rfq_rag::{IngestConfig, ReferenceIngestor, ReferenceLibrary, RecursiveChunker};
//!
//! let ingestor = ReferenceIngestor::builder()
//!     .config(IngestConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(store))
//!     .build()?;
//!
//! let report = ingestor.ingest_library(&ReferenceLibrary::new("./refs"), false).await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::IngestConfig;
use crate::document::ReferenceChunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::reference::{ReferenceFile, ReferenceLibrary};
use crate::vectorstore::VectorStore;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Target collection.
    pub collection: String,
    /// Whether ingestion was skipped because the collection already existed.
    pub skipped: bool,
    /// Number of reference files read.
    pub files: usize,
    /// Number of rows stored.
    pub rows: usize,
}

/// Chunks, embeds and stores reference files.
///
/// Construct one via [`ReferenceIngestor::builder()`].
pub struct ReferenceIngestor {
    config: IngestConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl ReferenceIngestor {
    /// Create a new [`ReferenceIngestorBuilder`].
    pub fn builder() -> ReferenceIngestorBuilder {
        ReferenceIngestorBuilder::default()
    }

    /// Return a reference to the ingestion configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest every file of `library` into the configured collection.
    ///
    /// Without `overwrite`, an existing collection is left untouched and the
    /// report is marked as skipped. With `overwrite`, the collection is dropped
    /// and rebuilt.
    ///
    /// Every file is read, chunked and embedded before the store is touched,
    /// so a failed run leaves an existing collection as it was.
    ///
    /// # Errors
    ///
    /// Fails on the first file that cannot be read or embedded, or if the
    /// store rejects the rows.
    pub async fn ingest_library(
        &self,
        library: &ReferenceLibrary,
        overwrite: bool,
    ) -> Result<IngestReport> {
        let collection = self.config.collection.as_str();
        let mut report = IngestReport { collection: collection.to_string(), ..Default::default() };

        let exists = self.vector_store.collection_exists(collection).await?;
        if exists && !overwrite {
            warn!(collection, "collection already exists, skipping ingestion");
            report.skipped = true;
            return Ok(report);
        }

        let files = library.load_all().await.inspect_err(|e| {
            error!(root = %library.root().display(), error = %e, "failed to load reference files")
        })?;
        let mut rows = Vec::new();
        for file in &files {
            rows.extend(self.embed_file(file).await?);
        }

        replace_collection(
            self.vector_store.as_ref(),
            collection,
            self.embedding_provider.dimensions(),
            exists,
            &rows,
        )
        .await?;
        report.files = files.len();
        report.rows = rows.len();

        info!(collection, files = report.files, rows = report.rows, "ingestion completed");
        Ok(report)
    }

    /// Chunk and embed one reference file into rows keyed by its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if the provider returns the wrong
    /// number of embeddings, or the provider error otherwise.
    pub async fn embed_file(&self, file: &ReferenceFile) -> Result<Vec<ReferenceChunk>> {
        let texts = self.chunker.chunk(&file.text);
        if texts.is_empty() {
            info!(document.id = %file.document_id, "empty reference file, nothing to store");
            return Ok(Vec::new());
        }

        let mut rows = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let inputs: Vec<&str> = batch.iter().map(String::as_str).collect();
            let embeddings = self.embedding_provider.embed_batch(&inputs).await.inspect_err(
                |e| error!(document.id = %file.document_id, error = %e, "batch embedding failed"),
            )?;

            if embeddings.len() != batch.len() {
                return Err(RagError::ChunkingError(format!(
                    "expected {} embeddings for '{}', got {}",
                    batch.len(),
                    file.document_id,
                    embeddings.len()
                )));
            }

            rows.extend(batch.iter().zip(embeddings).map(|(content, embedding)| ReferenceChunk {
                document_id: file.document_id.clone(),
                content: content.clone(),
                embedding,
            }));
        }

        debug!(
            document.id = %file.document_id,
            chunk_count = rows.len(),
            "embedded reference file"
        );
        Ok(rows)
    }
}

/// Drop `collection` if it `existed`, recreate it and store `rows`.
///
/// Callers prepare every row first; this is the only step that mutates the store.
pub(crate) async fn replace_collection(
    store: &dyn VectorStore,
    collection: &str,
    dimensions: usize,
    existed: bool,
    rows: &[ReferenceChunk],
) -> Result<()> {
    if existed {
        info!(collection, "dropping existing collection");
        store.delete_collection(collection).await?;
    }

    store
        .create_collection(collection, dimensions)
        .await
        .inspect_err(|e| error!(collection, error = %e, "failed to create collection"))?;

    if !rows.is_empty() {
        store
            .insert(collection, rows)
            .await
            .inspect_err(|e| error!(collection, rows = rows.len(), error = %e, "insert failed"))?;
    }
    Ok(())
}

/// Builder for constructing a [`ReferenceIngestor`].
///
/// The embedding provider and vector store are required. The chunker
/// defaults to a [`RecursiveChunker`] sized from the configuration.
#[derive(Default)]
pub struct ReferenceIngestorBuilder {
    config: Option<IngestConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl ReferenceIngestorBuilder {
    /// Set the ingestion configuration.
    pub fn config(mut self, config: IngestConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the chunking strategy.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`ReferenceIngestor`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<ReferenceIngestor> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });

        Ok(ReferenceIngestor { config, embedding_provider, vector_store, chunker })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::inmemory::InMemoryVectorStore;

    struct LengthEmbedder {
        batches: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn ingestor(
        store: Arc<InMemoryVectorStore>,
        embedder: Arc<LengthEmbedder>,
    ) -> ReferenceIngestor {
        let config = IngestConfig::builder()
            .chunk_size(10)
            .chunk_overlap(0)
            .batch_size(2)
            .build()
            .unwrap();
        ReferenceIngestor::builder()
            .config(config)
            .embedding_provider(embedder)
            .vector_store(store)
            .build()
            .unwrap()
    }

    fn library(files: &[(&str, &str)]) -> (tempfile::TempDir, ReferenceLibrary) {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            std::fs::write(dir.path().join(format!("{name}.md")), text).unwrap();
        }
        let library = ReferenceLibrary::new(dir.path());
        (dir, library)
    }

    #[tokio::test]
    async fn stores_chunks_under_file_stem_in_batches() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(LengthEmbedder { batches: AtomicUsize::new(0) });
        let ingestor = ingestor(store.clone(), embedder.clone());
        let (_dir, library) = library(&[("IFI_1", "aaaa bbbb cccc dddd eeee"), ("IFI_2", "")]);

        let report = ingestor.ingest_library(&library, false).await.unwrap();

        assert!(!report.skipped);
        assert_eq!(report.files, 2);
        assert_eq!(report.rows, 3);
        assert_eq!(embedder.batches.load(Ordering::SeqCst), 2);

        let matches = store.search("documents", &[5.0, 1.0], 10).await.unwrap();
        assert_eq!(matches.len(), 3);
        assert!(matches.iter().all(|m| m.document_id == "IFI_1"));
    }

    #[tokio::test]
    async fn existing_collection_is_skipped_without_overwrite() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(LengthEmbedder { batches: AtomicUsize::new(0) });
        store.create_collection("documents", 2).await.unwrap();
        let ingestor = ingestor(store.clone(), embedder.clone());
        let (_dir, library) = library(&[("IFI_1", "aaaa")]);

        let report = ingestor.ingest_library(&library, false).await.unwrap();

        assert!(report.skipped);
        assert_eq!(report.rows, 0);
        assert_eq!(embedder.batches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn overwrite_rebuilds_the_collection() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(LengthEmbedder { batches: AtomicUsize::new(0) });
        let ingestor = ingestor(store.clone(), embedder);
        let (_dir, library) = library(&[("IFI_1", "aaaa")]);

        ingestor.ingest_library(&library, false).await.unwrap();
        let report = ingestor.ingest_library(&library, true).await.unwrap();

        assert_eq!(report.rows, 1);
        let matches = store.search("documents", &[4.0, 1.0], 10).await.unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn unreadable_library_creates_no_collection() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(LengthEmbedder { batches: AtomicUsize::new(0) });
        let ingestor = ingestor(store.clone(), embedder);

        let missing = ReferenceLibrary::new("/no/such/reference/dir");
        let result = ingestor.ingest_library(&missing, false).await;

        assert!(matches!(result, Err(RagError::IoError(_))));
        assert!(!store.collection_exists("documents").await.unwrap());

        let (_dir, library) = library(&[("IFI_1", "aaaa")]);
        let report = ingestor.ingest_library(&library, false).await.unwrap();
        assert!(!report.skipped);
        assert_eq!(report.rows, 1);
    }

    #[tokio::test]
    async fn failed_overwrite_keeps_existing_rows() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(LengthEmbedder { batches: AtomicUsize::new(0) });
        let ingestor = ingestor(store.clone(), embedder);
        let (_dir, library) = library(&[("IFI_1", "aaaa bbbb cccc dddd eeee")]);
        let first = ingestor.ingest_library(&library, false).await.unwrap();

        let missing = ReferenceLibrary::new("/no/such/reference/dir");
        assert!(ingestor.ingest_library(&missing, true).await.is_err());

        let matches = store.search("documents", &[4.0, 1.0], 10).await.unwrap();
        assert_eq!(matches.len(), first.rows);
        assert!(matches.iter().all(|m| m.document_id == "IFI_1"));
    }

    #[tokio::test]
    async fn embed_file_keys_rows_by_identifier() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(LengthEmbedder { batches: AtomicUsize::new(0) });
        let ingestor = ingestor(store.clone(), embedder);
        let file = ReferenceFile { document_id: "IFI_7".into(), text: "abc".into() };

        let rows = ingestor.embed_file(&file).await.unwrap();

        assert_eq!(
            rows,
            vec![ReferenceChunk {
                document_id: "IFI_7".into(),
                content: "abc".into(),
                embedding: vec![3.0, 1.0],
            }]
        );
        assert!(!store.collection_exists("documents").await.unwrap());
    }

    #[test]
    fn builder_requires_collaborators() {
        let result = ReferenceIngestor::builder().build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }
}
