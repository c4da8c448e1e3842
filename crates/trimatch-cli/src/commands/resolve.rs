//! Resolve a single listing

use anyhow::Result;
use tracing::info;

use trimatch_core::{CandidateSupplier, Listing, TrimResolver};

use crate::cli::PipelineArgs;

use super::{load_vocab, resolver_config};

pub async fn cmd_resolve(
    pipeline: &PipelineArgs,
    make: &str,
    model: &str,
    trim: Option<String>,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let vocab = load_vocab(&pipeline.vocab)?;
    // a make/model with no vocabulary is a user-visible failure here,
    // unlike in batch mode
    let candidates = vocab.candidates(make, model)?;

    let mut listing = Listing::new("cli", make, model);
    listing.raw_trim = trim;
    listing.title = title;
    listing.description = description;

    let resolver = TrimResolver::new(resolver_config(pipeline));
    if pipeline.no_llm {
        info!("classifier stage disabled by --no-llm");
    } else if !resolver.classifier_enabled() {
        info!("no classifier credential configured; stage will be skipped");
    }

    let result = resolver.resolve(&listing, &candidates).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
