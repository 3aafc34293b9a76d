//! Deployment settings read from the environment.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use rfq_rag::gemini::{DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};
use rfq_rag::pgvector::PgConnectOptions;

/// Connection and model settings for the production collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub gemini_api_key: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub pg_host: String,
    pub pg_port: u16,
    pub pg_db: String,
    pub pg_user: String,
    pub pg_password: String,
    /// Directory holding the reference markdown files.
    pub ifi_dir: PathBuf,
    /// Directory holding CSV exports with precomputed embeddings.
    pub csv_dir: PathBuf,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("GEMINI_API_KEY must be set"))?;

        Ok(Self {
            gemini_api_key,
            embedding_model: or("GEMINI_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimensions: parse(&lookup, "GEMINI_EMBEDDING_DIMENSIONS")?
                .unwrap_or(DEFAULT_DIMENSIONS),
            pg_host: or("PG_HOST", "pgvector-db"),
            pg_port: parse(&lookup, "PG_PORT")?.unwrap_or(5432),
            pg_db: or("PG_DB", "vectordb"),
            pg_user: or("PG_USER", "postgres"),
            pg_password: or("PG_PASSWORD", "postgres"),
            ifi_dir: PathBuf::from(or("IFI_DIR", "./src/IFI_Table_Files")),
            csv_dir: PathBuf::from(or("CSV_DIR", "./src/data")),
        })
    }

    /// Connection options for the similarity store.
    pub fn connect_options(&self) -> PgConnectOptions {
        rfq_rag::pgvector::connect_options(
            &self.pg_host,
            self.pg_port,
            &self.pg_db,
            &self.pg_user,
            &self.pg_password,
        )
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("invalid {key}: {raw:?}")))
        .transpose()
}
