//! pgvector (PostgreSQL) similarity store backend.
//!
//! Provides [`PgVectorStore`] which implements [`VectorStore`] using
//! [sqlx](https://docs.rs/sqlx) with the
//! [pgvector](https://github.com/pgvector/pgvector) PostgreSQL extension.
//!
//! Each collection is one table:
//!
//! ```sql
//! CREATE TABLE documents (
//!     id SERIAL PRIMARY KEY,
//!     content TEXT,
//!     embedding VECTOR(3072),
//!     ifi_file_name TEXT
//! );
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rfq_rag::pgvector::{PgVectorStore, connect_options};
//!
//! let options = connect_options("pgvector-db", 5432, "vectordb", "postgres", "postgres");
//! let store = PgVectorStore::connect(options).await?;
//! let matches = store.search("documents", &query_embedding, 3).await?;
//! ```

use std::str::FromStr;

use async_trait::async_trait;
pub use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::document::{Match, ReferenceChunk};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "pgvector";

/// Connection options for the similarity database.
///
/// Each part is passed through as-is, so passwords and user names may hold
/// URL metacharacters such as `#`, `/`, `?` or `@`.
pub fn connect_options(
    host: &str,
    port: u16,
    database: &str,
    user: &str,
    password: &str,
) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(host)
        .port(port)
        .database(database)
        .username(user)
        .password(password)
}

/// A [`VectorStore`] backed by PostgreSQL with the pgvector extension.
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    /// Create a new pgvector store by connecting to the given database URL.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(database_url).map_err(Self::map_err)?;
        Self::connect(options).await
    }

    /// Create a new pgvector store from explicit connection options.
    pub async fn connect(options: PgConnectOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(Self::map_err)?;
        Ok(Self { pool })
    }

    /// Create a new pgvector store from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_err(e: sqlx::Error) -> RagError {
        RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
    }

    /// Sanitize a collection name for use as a table name.
    /// Only allows alphanumeric characters and underscores.
    fn table_name(name: &str) -> Result<String> {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if sanitized.trim_matches('_').is_empty() {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("invalid collection name '{name}'"),
            });
        }
        Ok(sanitized.to_ascii_lowercase())
    }
}

/// pgvector expects the vector as a string like `[1,2,3]`.
fn vector_literal(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(f32::to_string).collect();
    format!("[{}]", values.join(","))
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let table = Self::table_name(name)?;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;

        let create_sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id SERIAL PRIMARY KEY, \
                content TEXT, \
                embedding VECTOR({dimensions}), \
                ifi_file_name TEXT\
            )"
        );
        sqlx::query(&create_sql).execute(&self.pool).await.map_err(Self::map_err)?;

        debug!(collection = name, table = %table, dimensions, "created pgvector table");
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let table = Self::table_name(name)?;
        let row = sqlx::query(
            "SELECT EXISTS (\
                SELECT 1 FROM information_schema.tables \
                WHERE table_schema = current_schema() AND table_name = $1\
            ) AS present",
        )
        .bind(&table)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_err)?;

        row.try_get::<bool, _>("present").map_err(Self::map_err)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let table = Self::table_name(name)?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, table = %table, "dropped pgvector table");
        Ok(())
    }

    async fn insert(&self, collection: &str, chunks: &[ReferenceChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let table = Self::table_name(collection)?;
        let insert_sql = format!(
            "INSERT INTO {table} (content, embedding, ifi_file_name) VALUES ($1, $2::vector, $3)"
        );

        let mut tx = self.pool.begin().await.map_err(Self::map_err)?;
        for chunk in chunks {
            sqlx::query(&insert_sql)
                .bind(&chunk.content)
                .bind(vector_literal(&chunk.embedding))
                .bind(&chunk.document_id)
                .execute(&mut *tx)
                .await
                .map_err(Self::map_err)?;
        }
        tx.commit().await.map_err(Self::map_err)?;

        debug!(collection, count = chunks.len(), "inserted rows into pgvector");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<Match>> {
        let table = Self::table_name(collection)?;

        // `<=>` is cosine distance, so similarity is 1 - distance
        let search_sql = format!(
            "SELECT content, ifi_file_name, \
                    1 - (embedding <=> $1::vector) AS similarity \
             FROM {table} \
             ORDER BY similarity DESC \
             LIMIT $2"
        );

        let rows = sqlx::query(&search_sql)
            .bind(vector_literal(embedding))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?;

        rows.iter()
            .map(|row| -> Result<Match> {
                let content: Option<String> = row.try_get("content").map_err(Self::map_err)?;
                let document_id: Option<String> =
                    row.try_get("ifi_file_name").map_err(Self::map_err)?;
                let score: Option<f64> = row.try_get("similarity").map_err(Self::map_err)?;

                let document_id = document_id.ok_or_else(|| {
                    RagError::MalformedMatch("row has no ifi_file_name".to_string())
                })?;
                let score = score.ok_or_else(|| {
                    RagError::MalformedMatch(format!("row for '{document_id}' has no similarity"))
                })?;
                Ok(Match { content: content.unwrap_or_default(), document_id, score })
            })
            .collect()
    }
}
