mod cli;
mod commands;
mod settings;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries JSON results, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Ingest { dir, overwrite } => {
            commands::ingest(&settings, &cli.collection, dir, overwrite).await
        }
        Commands::IngestCsv { dir, overwrite } => {
            commands::ingest_csv(&settings, &cli.collection, dir, overwrite).await
        }
        Commands::Retrieve { text, top_n, scores } => {
            commands::retrieve(&settings, &cli.collection, &text, top_n, scores).await
        }
        Commands::Context { query, descriptions, top_n, with_files } => {
            commands::context(
                &settings,
                &cli.collection,
                &query,
                &descriptions,
                top_n,
                with_files,
            )
            .await
        }
    }
}
