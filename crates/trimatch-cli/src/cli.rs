//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Trimatch - resolve marketplace trim strings to canonical trims
#[derive(Parser)]
#[command(name = "trimatch")]
#[command(about = "Vehicle trim resolver for marketplace listings", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Pipeline options shared by the matching commands.
#[derive(Args, Clone)]
pub struct PipelineArgs {
    /// Vocabulary file: JSON array of {make, model, trims, aliases}
    #[arg(long)]
    pub vocab: PathBuf,

    /// Skip the external classifier stage
    ///
    /// The stage is also skipped automatically when PERPLEXITY_API_KEY is
    /// not set.
    #[arg(long)]
    pub no_llm: bool,

    /// Fuzzy tier-1 acceptance threshold (0-100)
    #[arg(long, default_value = "82")]
    pub primary_threshold: u8,

    /// Fuzzy tier-2 acceptance threshold (0-100)
    #[arg(long, default_value = "74")]
    pub secondary_threshold: u8,

    /// Minimum classifier confidence to accept an answer (0.0-1.0)
    #[arg(long, default_value = "0.55")]
    pub min_confidence: f64,

    /// Classifier rate limit in queries per second (0 disables the gate)
    #[arg(long, default_value = "1.3")]
    pub max_qps: f64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a single listing and print the match result
    Resolve {
        #[command(flatten)]
        pipeline: PipelineArgs,

        #[arg(long)]
        make: String,

        #[arg(long)]
        model: String,

        /// Scraped free-text trim
        #[arg(long)]
        trim: Option<String>,

        /// Listing title (tier-2 fuzzy context)
        #[arg(long)]
        title: Option<String>,

        /// Listing description (tier-2 fallback context)
        #[arg(long)]
        description: Option<String>,
    },

    /// Resolve a file of listings, committing results incrementally
    Batch {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Listings file: JSON array of {id, make, model, raw_trim, title, description}
        #[arg(long)]
        listings: PathBuf,

        /// Output file; one JSON update per line, appended as each listing resolves
        #[arg(short, long)]
        out: PathBuf,

        /// Process at most this many listings
        #[arg(long)]
        limit: Option<usize>,

        /// Concurrent listings in flight
        #[arg(long, default_value = "8")]
        concurrency: usize,
    },

    /// Show the top fuzzy-scored candidates for a raw trim
    Rank {
        /// Vocabulary file: JSON array of {make, model, trims, aliases}
        #[arg(long)]
        vocab: PathBuf,

        #[arg(long)]
        make: String,

        #[arg(long)]
        model: String,

        /// Raw trim to score
        #[arg(long)]
        trim: String,

        /// Number of candidates to show
        #[arg(long, default_value = "10")]
        top: usize,
    },
}
