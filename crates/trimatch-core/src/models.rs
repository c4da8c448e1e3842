//! Core value types
//!
//! A listing is snapshotted into a [`Listing`] once at the pipeline boundary;
//! the pipeline hands back exactly one [`MatchResult`] per listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::method::AssignmentMethod;

/// Immutable snapshot of a marketplace listing entering the pipeline.
///
/// Optional fields may be empty but are always explicitly typed as such; the
/// pipeline never probes for attributes at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Marketplace ad identifier.
    pub id: String,
    pub make: String,
    pub model: String,
    /// Scraped free-text trim, if the listing carried one.
    #[serde(default)]
    pub raw_trim: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Listing {
    pub fn new(id: impl Into<String>, make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            make: make.into(),
            model: model.into(),
            raw_trim: None,
            title: None,
            description: None,
        }
    }

    pub fn with_raw_trim(mut self, raw_trim: impl Into<String>) -> Self {
        self.raw_trim = Some(raw_trim.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Raw trim with surrounding whitespace stripped, empty if absent.
    pub fn raw_trim_trimmed(&self) -> &str {
        self.raw_trim.as_deref().map(str::trim).unwrap_or("")
    }
}

/// Outcome of resolving one listing against one candidate set.
///
/// Invariants: `trim` is present exactly when `method != Unmatched`;
/// an unmatched result always carries confidence 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub trim: Option<String>,
    pub confidence: f64,
    pub method: AssignmentMethod,
}

impl MatchResult {
    pub fn matched(trim: impl Into<String>, confidence: f64, method: AssignmentMethod) -> Self {
        Self {
            trim: Some(trim.into()),
            confidence: confidence.clamp(0.0, 1.0),
            method,
        }
    }

    pub fn unmatched() -> Self {
        Self {
            trim: None,
            confidence: 0.0,
            method: AssignmentMethod::Unmatched,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.method != AssignmentMethod::Unmatched
    }
}

/// One immutable history entry, written together with the persisted update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub listing_id: String,
    pub old_trim: Option<String>,
    pub new_trim: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_invariants() {
        let r = MatchResult::unmatched();
        assert!(r.trim.is_none());
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.method, AssignmentMethod::Unmatched);
        assert!(!r.is_matched());
    }

    #[test]
    fn test_matched_clamps_confidence() {
        let r = MatchResult::matched("SE", 1.7, AssignmentMethod::Llm);
        assert_eq!(r.confidence, 1.0);
        let r = MatchResult::matched("SE", -0.1, AssignmentMethod::Llm);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn test_listing_deserializes_without_optional_fields() {
        let l: Listing =
            serde_json::from_str(r#"{"id":"a1","make":"Toyota","model":"Camry"}"#).unwrap();
        assert!(l.raw_trim.is_none());
        assert_eq!(l.raw_trim_trimmed(), "");
    }

    #[test]
    fn test_raw_trim_trimmed() {
        let l = Listing::new("a1", "Toyota", "Camry").with_raw_trim("  SE ");
        assert_eq!(l.raw_trim_trimmed(), "SE");
    }
}
