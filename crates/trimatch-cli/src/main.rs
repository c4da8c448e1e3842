//! Trimatch CLI - Vehicle trim resolver
//!
//! Usage:
//!   trimatch resolve --vocab trims.json --make Toyota --model Camry --trim "se plus"
//!   trimatch batch --vocab trims.json --listings listings.json --out updates.jsonl
//!   trimatch rank --vocab trims.json --make Toyota --model Camry --trim "sport"

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Resolve {
            pipeline,
            make,
            model,
            trim,
            title,
            description,
        } => commands::cmd_resolve(&pipeline, &make, &model, trim, title, description).await,
        Commands::Batch {
            pipeline,
            listings,
            out,
            limit,
            concurrency,
        } => commands::cmd_batch(&pipeline, &listings, &out, limit, concurrency).await,
        Commands::Rank {
            vocab,
            make,
            model,
            trim,
            top,
        } => commands::cmd_rank(&vocab, &make, &model, &trim, top),
    }
}
