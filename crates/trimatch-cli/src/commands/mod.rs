//! Command implementations

mod batch;
mod rank;
mod resolve;

pub use batch::cmd_batch;
pub use rank::cmd_rank;
pub use resolve::cmd_resolve;

use std::path::Path;

use anyhow::{Context, Result};

use trimatch_core::{ResolverConfig, VocabTable};

use crate::cli::PipelineArgs;

/// Load the JSON vocabulary file into an in-memory candidate supplier.
pub fn load_vocab(path: &Path) -> Result<VocabTable> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read vocabulary file {}", path.display()))?;
    VocabTable::from_json(&json)
        .with_context(|| format!("invalid vocabulary file {}", path.display()))
}

/// Translate CLI flags into a resolver config.
pub fn resolver_config(args: &PipelineArgs) -> ResolverConfig {
    ResolverConfig {
        allow_external_classifier: !args.no_llm,
        fuzzy_primary_threshold: args.primary_threshold,
        fuzzy_secondary_threshold: args.secondary_threshold,
        min_classifier_confidence: args.min_confidence,
        max_queries_per_second: args.max_qps,
        ..ResolverConfig::default()
    }
}
