use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rfq_rag::gemini::{GeminiClient, GeminiEmbeddingProvider, GeminiTokenCounter, TaskType};
use rfq_rag::pgvector::PgVectorStore;
use rfq_rag::{
    CsvImporter, IngestConfig, ReferenceIngestor, ReferenceLibrary, RetrievalConfig,
    SimilarityRetriever, collect_context,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::settings::Settings;

fn gemini_client(settings: &Settings) -> Result<GeminiClient> {
    Ok(GeminiClient::new(&settings.gemini_api_key)?.with_model(&settings.embedding_model))
}

async fn store(settings: &Settings) -> Result<Arc<PgVectorStore>> {
    let store = PgVectorStore::connect(settings.connect_options())
        .await
        .with_context(|| format!("connecting to {}:{}", settings.pg_host, settings.pg_port))?;
    Ok(Arc::new(store))
}

async fn retriever(
    settings: &Settings,
    collection: &str,
    top_n: usize,
) -> Result<SimilarityRetriever> {
    let client = gemini_client(settings)?;
    let embedder =
        GeminiEmbeddingProvider::new(client.clone()).with_dimensions(settings.embedding_dimensions);
    let config = RetrievalConfig::builder().collection(collection).top_n(top_n).build()?;

    Ok(SimilarityRetriever::builder()
        .config(config)
        .embedding_provider(Arc::new(embedder))
        .token_counter(Arc::new(GeminiTokenCounter::new(client)))
        .vector_store(store(settings).await?)
        .build()?)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn ingest(
    settings: &Settings,
    collection: &str,
    dir: Option<PathBuf>,
    overwrite: bool,
) -> Result<()> {
    let library = ReferenceLibrary::new(dir.unwrap_or_else(|| settings.ifi_dir.clone()));
    let embedder = GeminiEmbeddingProvider::new(gemini_client(settings)?)
        .with_task_type(TaskType::RetrievalDocument)
        .with_dimensions(settings.embedding_dimensions);
    let config = IngestConfig::builder().collection(collection).build()?;

    let ingestor = ReferenceIngestor::builder()
        .config(config)
        .embedding_provider(Arc::new(embedder))
        .vector_store(store(settings).await?)
        .build()?;

    info!(dir = %library.root().display(), collection, overwrite, "ingesting reference files");
    let report = ingestor.ingest_library(&library, overwrite).await?;
    print_json(&report)
}

pub async fn ingest_csv(
    settings: &Settings,
    collection: &str,
    dir: Option<PathBuf>,
    overwrite: bool,
) -> Result<()> {
    let dir = dir.unwrap_or_else(|| settings.csv_dir.clone());
    let importer =
        CsvImporter::new(store(settings).await?, collection, settings.embedding_dimensions);

    info!(dir = %dir.display(), collection, overwrite, "importing precomputed embeddings");
    let report = importer.import_dir(&dir, overwrite).await?;
    print_json(&report)
}

pub async fn retrieve(
    settings: &Settings,
    collection: &str,
    text: &str,
    top_n: usize,
    scores: bool,
) -> Result<()> {
    let retriever = retriever(settings, collection, top_n).await?;
    if scores {
        print_json(&retriever.rank(text, retriever.config().top_n).await?)
    } else {
        print_json(&retriever.retrieve(text).await?)
    }
}

pub async fn context(
    settings: &Settings,
    collection: &str,
    query: &str,
    descriptions: &[String],
    top_n: usize,
    with_files: bool,
) -> Result<()> {
    let retriever = retriever(settings, collection, top_n).await?;
    let collected = collect_context(&retriever, descriptions, query, top_n).await?;

    let mut files = serde_json::Map::new();
    if with_files {
        let library = ReferenceLibrary::new(&settings.ifi_dir);
        for id in collected.resources() {
            files.insert(id.to_string(), library.read(id).await?.into());
        }
    }

    print_json(&json!({
        "contexts": collected.contexts,
        "resources": collected.resources(),
        "files": files,
    }))
}
