use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "rfq", version, about = "Fastener RFQ reference ingestion and retrieval")]
pub struct Cli {
    /// Store collection holding reference rows.
    #[arg(long, global = true, default_value = "documents")]
    pub collection: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, embed and store every reference file.
    Ingest {
        /// Reference directory (defaults to IFI_DIR).
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Drop and rebuild an existing collection.
        #[arg(long)]
        overwrite: bool,
    },
    /// Load rows with precomputed embeddings from CSV exports.
    IngestCsv {
        /// CSV directory (defaults to CSV_DIR).
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Drop and rebuild an existing collection.
        #[arg(long)]
        overwrite: bool,
    },
    /// Rank reference documents for one piece of text.
    Retrieve {
        text: String,
        #[arg(long, default_value_t = 3)]
        top_n: usize,
        /// Print accumulated scores alongside each document.
        #[arg(long)]
        scores: bool,
    },
    /// Gather merged context for a query and its line-item descriptions.
    Context {
        #[arg(long)]
        query: String,
        #[arg(long = "description")]
        descriptions: Vec<String>,
        #[arg(long, default_value_t = 3)]
        top_n: usize,
        /// Attach the full reference file for every identifier.
        #[arg(long)]
        with_files: bool,
    },
}
