//! # rfq-rag
//!
//! Similarity retrieval for fastener RFQ drafting.
//!
//! ## Overview
//!
//! Given the free text of a customer request (an email body, a line-item
//! description from an attached spreadsheet), this crate finds the reference
//! tables most relevant to it:
//!
//! - [`split_into_windows`] cuts the text into overlapping windows that fit the
//!   embedding model's token budget, asking a [`TokenCounter`] to verify each one
//! - [`SimilarityRetriever`] embeds and searches every window, then sums scores
//!   per reference document and keeps the best `top_n`
//! - [`collect_context`] fans out over a query and its line-item descriptions
//!   and merges the results first-seen-wins
//!
//! Reference tables are loaded into the store by [`ReferenceIngestor`], or
//! from CSV exports with precomputed embeddings by [`CsvImporter`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rfq_rag::{InMemoryVectorStore, RetrievalConfig, SimilarityRetriever};
//! use rfq_rag::gemini::{GeminiClient, GeminiEmbeddingProvider, GeminiTokenCounter};
//!
//! let client = GeminiClient::new(std::env::var("GEMINI_API_KEY")?)?;
//! let retriever = SimilarityRetriever::builder()
//!     .config(RetrievalConfig::default())
//!     .embedding_provider(Arc::new(GeminiEmbeddingProvider::new(client.clone())))
//!     .token_counter(Arc::new(GeminiTokenCounter::new(client)))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let contexts = retriever.get_context_and_ifi("200 pcs M12x60 DIN 931 8.8", 3).await?;
//! ```
//!
//! ## Features
//!
//! - `gemini` (default): Gemini REST embedding provider and token counter
//! - `pgvector`: PostgreSQL + pgvector similarity store
//! - `full`: everything

pub mod aggregate;
pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod inmemory;
pub mod ingest;
#[cfg(feature = "pgvector")]
pub mod pgvector;
pub mod precomputed;
pub mod reference;
pub mod retriever;
pub mod tokens;
pub mod vectorstore;
pub mod windowing;

pub use aggregate::{ScoreBoard, aggregate, merge_unique};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{IngestConfig, IngestConfigBuilder, RetrievalConfig, RetrievalConfigBuilder};
pub use context::{CollectedContext, collect_context};
pub use document::{Match, RankedDocument, ReferenceChunk, RetrievedContext, Window};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use inmemory::InMemoryVectorStore;
pub use ingest::{IngestReport, ReferenceIngestor, ReferenceIngestorBuilder};
pub use precomputed::{CsvImporter, parse_csv};
pub use reference::{ReferenceFile, ReferenceLibrary};
pub use retriever::{SimilarityRetriever, SimilarityRetrieverBuilder};
pub use tokens::TokenCounter;
pub use vectorstore::VectorStore;
pub use windowing::split_into_windows;
