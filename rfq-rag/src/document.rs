//! Data types for stored reference rows, store matches, windows and ranked results.

use serde::{Deserialize, Serialize};

/// A stored row of reference content with its vector embedding.
///
/// Several rows may share one `document_id` when a reference file was
/// split into multiple chunks at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceChunk {
    /// Identifier of the reference file this row belongs to (e.g. an IFI table name).
    pub document_id: String,
    /// The text content of the row.
    pub content: String,
    /// The vector embedding for this row's content.
    pub embedding: Vec<f32>,
}

/// A single similarity-store result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    /// The matched row's content.
    pub content: String,
    /// Identifier of the reference document the row belongs to.
    pub document_id: String,
    /// Similarity score, `1 - cosine_distance` (higher is more similar).
    pub score: f64,
}

impl Match {
    /// Create a new match.
    pub fn new(content: impl Into<String>, document_id: impl Into<String>, score: f64) -> Self {
        Self { content: content.into(), document_id: document_id.into(), score }
    }
}

/// A bounded fragment of the input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Offset of the first character of this window in the source text, in characters.
    pub start: usize,
    /// The window text.
    pub text: String,
}

/// A reference document after cross-window aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedDocument {
    /// Identifier of the reference document.
    pub document_id: String,
    /// Content from the last window that matched this document.
    pub content: String,
    /// Sum of the similarity scores from every window that matched it.
    pub score: f64,
}

/// A `(content, identifier)` pair handed to the prompt-building layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrievedContext {
    /// Reference content.
    pub content: String,
    /// Reference document identifier.
    pub document_id: String,
}

impl From<RankedDocument> for RetrievedContext {
    fn from(ranked: RankedDocument) -> Self {
        Self { content: ranked.content, document_id: ranked.document_id }
    }
}
