//! Batch resolution over a listings file

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::info;

use trimatch_core::{AuditSink, BatchRunner, Listing, ResolvedUpdate, TrimResolver};

use crate::cli::PipelineArgs;

use super::{load_vocab, resolver_config};

/// Appends one JSON line per committed update. Commits are serialized
/// through a mutex so concurrent resolution tasks never interleave lines.
struct JsonlSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .with_context(|| format!("failed to open output file {}", path.display()))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl AuditSink for JsonlSink {
    fn commit(&self, update: &ResolvedUpdate) -> trimatch_core::Result<()> {
        let line = serde_json::to_string(update)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| trimatch_core::Error::Audit("output writer poisoned".to_string()))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        // flush per line so an interrupted batch keeps every committed update
        writer.flush()?;
        Ok(())
    }
}

fn load_listings(path: &Path) -> Result<Vec<Listing>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read listings file {}", path.display()))?;
    let listings: Vec<Listing> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse listings file {}", path.display()))?;
    Ok(listings)
}

pub async fn cmd_batch(
    pipeline: &PipelineArgs,
    listings_path: &Path,
    out: &Path,
    limit: Option<usize>,
    concurrency: usize,
) -> Result<()> {
    let vocab = Arc::new(load_vocab(&pipeline.vocab)?);

    let mut listings = load_listings(listings_path)?;
    if let Some(limit) = limit {
        listings.truncate(limit);
    }
    info!(count = listings.len(), "starting batch resolution");

    let resolver = Arc::new(TrimResolver::new(resolver_config(pipeline)));
    let sink = Arc::new(JsonlSink::create(out)?);

    let runner = BatchRunner::new(resolver, concurrency);
    let summary = runner.run(listings, vocab, sink).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
