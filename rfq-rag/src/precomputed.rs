//! Import of precomputed embeddings.
//!
//! Rows exported with their embeddings already computed live in `*.csv`
//! files with a header row naming the columns `content`, `embedding` and
//! `IFI_file_name`. The embedding is a JSON array of floats, e.g.
//! `"[0.12, -0.4, ...]"`. Other columns are ignored.
//!
//! # Example
//!
//! ```rust,ignore
//! use rfq_rag::{CsvImporter, InMemoryVectorStore};
//!
//! let importer = CsvImporter::new(Arc::new(InMemoryVectorStore::new()), "documents", 3072);
//! let report = importer.import_dir("./src/data", false).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::document::ReferenceChunk;
use crate::error::{RagError, Result};
use crate::ingest::{IngestReport, replace_collection};
use crate::vectorstore::VectorStore;

const EXTENSION: &str = "csv";

#[derive(Debug, Deserialize)]
struct CsvRow {
    content: String,
    embedding: String,
    #[serde(rename = "IFI_file_name")]
    document_id: String,
}

/// Loads precomputed rows from CSV files into a collection.
pub struct CsvImporter {
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    dimensions: usize,
}

impl CsvImporter {
    /// Create an importer writing to `collection`, whose rows must all have
    /// `dimensions` components.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self { vector_store, collection: collection.into(), dimensions }
    }

    /// Import every `*.csv` file in `dir`, in file name order.
    ///
    /// Without `overwrite`, an existing collection is left untouched and the
    /// report is marked as skipped. Every file is parsed before the store is
    /// touched, so one bad row leaves an existing collection as it was.
    ///
    /// # Errors
    ///
    /// - [`RagError::IoError`] if the directory or a file cannot be read
    /// - [`RagError::ConfigError`] if a file is not valid CSV or lacks a column
    /// - [`RagError::MalformedMatch`] for a row with an unparsable embedding,
    ///   the wrong dimension or an empty identifier
    pub async fn import_dir(
        &self,
        dir: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<IngestReport> {
        let dir = dir.as_ref();
        let collection = self.collection.as_str();
        let mut report = IngestReport { collection: collection.to_string(), ..Default::default() };

        let exists = self.vector_store.collection_exists(collection).await?;
        if exists && !overwrite {
            warn!(collection, "collection already exists, skipping import");
            report.skipped = true;
            return Ok(report);
        }

        let files = csv_files(dir)
            .await
            .inspect_err(|e| error!(dir = %dir.display(), error = %e, "failed to list csv files"))?;
        let mut rows = Vec::new();
        for path in &files {
            let data = tokio::fs::read(path).await?;
            let parsed = parse_csv(&path.display().to_string(), &data, self.dimensions)
                .inspect_err(|e| error!(path = %path.display(), error = %e, "rejected csv file"))?;
            debug!(path = %path.display(), rows = parsed.len(), "parsed csv file");
            rows.extend(parsed);
        }

        replace_collection(self.vector_store.as_ref(), collection, self.dimensions, exists, &rows)
            .await?;
        report.files = files.len();
        report.rows = rows.len();

        info!(collection, files = report.files, rows = report.rows, "csv import completed");
        Ok(report)
    }
}

async fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION)
            && entry.file_type().await?.is_file()
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse one CSV export into rows. `source` names the data in error messages.
///
/// # Errors
///
/// See [`CsvImporter::import_dir`].
pub fn parse_csv(source: &str, data: &[u8], dimensions: usize) -> Result<Vec<ReferenceChunk>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut rows = Vec::new();

    for (index, record) in reader.deserialize::<CsvRow>().enumerate() {
        let record = record.map_err(|e| RagError::ConfigError(format!("{source}: {e}")))?;
        let at = || format!("{source} record {}", index + 1);

        if record.document_id.trim().is_empty() {
            return Err(RagError::MalformedMatch(format!("{}: empty IFI_file_name", at())));
        }
        let embedding: Vec<f32> = serde_json::from_str(&record.embedding)
            .map_err(|e| RagError::MalformedMatch(format!("{}: bad embedding: {e}", at())))?;
        if embedding.len() != dimensions {
            return Err(RagError::MalformedMatch(format!(
                "{}: expected {dimensions} dimensions, got {}",
                at(),
                embedding.len()
            )));
        }

        rows.push(ReferenceChunk {
            document_id: record.document_id,
            content: record.content,
            embedding,
        });
    }
    Ok(rows)
}
