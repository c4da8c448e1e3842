//! Rank vocabulary candidates against a query string

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use trimatch_core::{rank_candidates, CandidateSupplier};

use super::load_vocab;

pub fn cmd_rank(vocab_path: &Path, make: &str, model: &str, trim: &str, top: usize) -> Result<()> {
    let vocab = load_vocab(vocab_path)?;
    let candidates = vocab.candidates(make, model)?;

    let ranked: Vec<_> = rank_candidates(trim, &candidates, top)
        .into_iter()
        // scores are reported on the same 0-1 scale as resolver confidence
        .map(|(trim, score)| json!({ "trim": trim, "score": score / 100.0 }))
        .collect();

    println!("{}", serde_json::to_string_pretty(&ranked)?);
    Ok(())
}
