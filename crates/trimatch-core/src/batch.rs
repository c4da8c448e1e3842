//! Batch resolution
//!
//! Parallelizes at listing granularity: exact/fuzzy work runs unconstrained
//! across tasks while every classifier call still funnels through the shared
//! rate limiter. Each result is committed through the sink as soon as it is
//! ready, so a cancelled or failed batch keeps everything already resolved —
//! there is no batch-wide transaction.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::audit::{AuditSink, ResolvedUpdate, CHANGED_BY_SYSTEM};
use crate::candidates::{CandidateSet, CandidateSupplier};
use crate::error::Error;
use crate::method::AssignmentMethod;
use crate::models::Listing;
use crate::resolver::TrimResolver;

/// Per-method counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub exact: usize,
    pub llm: usize,
    pub fuzzy: usize,
    pub manual: usize,
    pub unmatched: usize,
    /// Listings whose supplier lookup or sink commit errored.
    pub failed: usize,
}

impl BatchSummary {
    fn count(&mut self, method: AssignmentMethod) {
        self.processed += 1;
        match method {
            AssignmentMethod::Exact => self.exact += 1,
            AssignmentMethod::Llm => self.llm += 1,
            AssignmentMethod::Fuzzy => self.fuzzy += 1,
            AssignmentMethod::Manual => self.manual += 1,
            AssignmentMethod::Unmatched => self.unmatched += 1,
        }
    }
}

/// Concurrent batch runner over a resolver, supplier, and sink.
pub struct BatchRunner {
    resolver: Arc<TrimResolver>,
    max_concurrency: usize,
}

impl BatchRunner {
    pub fn new(resolver: Arc<TrimResolver>, max_concurrency: usize) -> Self {
        Self {
            resolver,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Resolve every listing, committing each update as it completes.
    ///
    /// A missing vocabulary for a listing's make/model is not an error: it
    /// resolves as unmatched against an empty candidate set, flagged for
    /// review. Any other supplier error, and any sink error, marks the
    /// listing failed and the batch keeps going.
    pub async fn run<S, K>(&self, listings: Vec<Listing>, supplier: Arc<S>, sink: Arc<K>) -> BatchSummary
    where
        S: CandidateSupplier + 'static,
        K: AuditSink + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<Result<AssignmentMethod, ()>> = JoinSet::new();

        for listing in listings {
            let resolver = self.resolver.clone();
            let supplier = supplier.clone();
            let sink = sink.clone();
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");

                let candidates = match supplier.candidates(&listing.make, &listing.model) {
                    Ok(set) => set,
                    Err(Error::NotFound(_)) => {
                        debug!(
                            listing_id = %listing.id,
                            make = %listing.make,
                            model = %listing.model,
                            "no vocabulary for pairing; resolving as unmatched"
                        );
                        CandidateSet::new()
                    }
                    Err(e) => {
                        warn!(listing_id = %listing.id, error = %e, "candidate lookup failed");
                        return Err(());
                    }
                };

                let result = resolver.resolve(&listing, &candidates).await;
                let update =
                    ResolvedUpdate::from_match(&listing, None, &result, CHANGED_BY_SYSTEM);

                // commit immediately: progress survives a cancelled batch
                if let Err(e) = sink.commit(&update) {
                    warn!(listing_id = %listing.id, error = %e, "commit failed");
                    return Err(());
                }
                Ok(result.method)
            });
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(method)) => summary.count(method),
                Ok(Err(())) => summary.failed += 1,
                Err(e) => {
                    warn!(error = %e, "batch task panicked");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}
