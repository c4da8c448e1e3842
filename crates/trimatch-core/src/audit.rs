//! Audit seam
//!
//! Every accepted resolution and every manual override is paired with an
//! immutable history entry. The pipeline builds a [`ResolvedUpdate`] — the
//! persisted value and its audit record together — and hands it to an
//! [`AuditSink`], whose implementors must write both or neither.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::method::AssignmentMethod;
use crate::models::{AuditRecord, Listing, MatchResult};

/// Actor label for pipeline-produced updates.
pub const CHANGED_BY_SYSTEM: &str = "system_match";

/// The value to persist for a listing plus its history entry.
///
/// `new_trim` is never empty: an unmatched result falls back to the raw trim
/// and then to the literal `"unmatched"`, so downstream consumers always see
/// a value, with `needs_review` routing it to a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedUpdate {
    pub listing_id: String,
    pub new_trim: String,
    pub confidence: f64,
    pub method: AssignmentMethod,
    pub needs_review: bool,
    pub record: AuditRecord,
}

impl ResolvedUpdate {
    /// Build an update from a pipeline result. `previous_trim` is the value
    /// currently persisted for the listing, if any.
    pub fn from_match(
        listing: &Listing,
        previous_trim: Option<&str>,
        result: &MatchResult,
        changed_by: &str,
    ) -> Self {
        let raw = listing.raw_trim_trimmed();
        let fallback = || {
            if raw.is_empty() {
                "unmatched".to_string()
            } else {
                raw.to_string()
            }
        };
        let new_trim = result.trim.clone().unwrap_or_else(fallback);
        let old_trim = previous_trim
            .map(str::to_string)
            .or_else(|| (!raw.is_empty()).then(|| raw.to_string()));

        Self {
            listing_id: listing.id.clone(),
            new_trim: new_trim.clone(),
            confidence: result.confidence,
            method: result.method,
            needs_review: !result.is_matched(),
            record: AuditRecord {
                listing_id: listing.id.clone(),
                old_trim,
                new_trim,
                changed_by: changed_by.to_string(),
                changed_at: Utc::now(),
            },
        }
    }

    /// Build a manual override. Confidence defaults to 1.0 at the call sites
    /// that own review tooling; it is explicit here so partial-confidence
    /// overrides stay expressible.
    pub fn manual(
        listing_id: &str,
        previous_trim: Option<&str>,
        new_trim: &str,
        confidence: f64,
        changed_by: &str,
    ) -> Self {
        Self {
            listing_id: listing_id.to_string(),
            new_trim: new_trim.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            method: AssignmentMethod::Manual,
            needs_review: false,
            record: AuditRecord {
                listing_id: listing_id.to_string(),
                old_trim: previous_trim.map(str::to_string),
                new_trim: new_trim.to_string(),
                changed_by: changed_by.to_string(),
                changed_at: Utc::now(),
            },
        }
    }
}

/// Persists resolved updates. The value and its audit record must land
/// together; skipping the history entry is not an option.
pub trait AuditSink: Send + Sync {
    fn commit(&self, update: &ResolvedUpdate) -> Result<()>;
}
