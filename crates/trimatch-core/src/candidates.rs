//! Candidate trim sets and the vocabulary seam
//!
//! A candidate set is the complete controlled vocabulary (canonical trims plus
//! registered aliases) for one make/model pairing. Entries keep their original
//! display form; identity is their normalized key.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::normalize::normalize;

/// Upper bound on entries per candidate set. Bounds matching cost; anything
/// past the cap is dropped with a warning.
pub const MAX_CANDIDATES: usize = 2_000;

/// Ordered, normalized-unique set of candidate trim display strings.
///
/// First-seen-wins: when two inputs normalize identically, the earlier display
/// form is kept and later ones are ignored. No two entries normalize to the
/// same key.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    display: Vec<String>,
    by_key: HashMap<String, usize>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from display strings, deduplicating by normalized key and
    /// capping at [`MAX_CANDIDATES`].
    pub fn from_display<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        let mut dropped = 0usize;
        for item in items {
            if set.len() >= MAX_CANDIDATES {
                dropped += 1;
                continue;
            }
            set.insert(item.into());
        }
        if dropped > 0 {
            warn!(dropped, cap = MAX_CANDIDATES, "candidate set truncated");
        }
        set
    }

    /// Insert one display string. Returns false if it normalizes to an
    /// existing key (or to nothing) and was ignored.
    pub fn insert(&mut self, display: String) -> bool {
        let key = normalize(&display);
        if key.is_empty() || self.by_key.contains_key(&key) {
            return false;
        }
        self.by_key.insert(key, self.display.len());
        self.display.push(display);
        true
    }

    /// Look up a candidate by the normalized key of `text`, returning its
    /// original display form.
    pub fn get_by_normalized(&self, text: &str) -> Option<&str> {
        let key = normalize(text);
        self.by_key.get(&key).map(|&i| self.display[i].as_str())
    }

    /// Candidate display strings in first-seen order.
    pub fn display_strings(&self) -> &[String] {
        &self.display
    }

    /// Normalized keys in first-seen order (recomputed; candidates are few).
    pub fn normalized_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.display.iter().map(|d| normalize(d))
    }

    pub fn len(&self) -> usize {
        self.display.len()
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_empty()
    }
}

/// Source of candidate vocabularies, keyed by make/model.
///
/// Implementations own lookup, storage, and curation; the pipeline only
/// consumes the returned set.
pub trait CandidateSupplier: Send + Sync {
    fn candidates(&self, make: &str, model: &str) -> Result<CandidateSet>;
}

/// One make/model entry in a vocabulary file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabEntry {
    pub make: String,
    pub model: String,
    /// Canonical trim names.
    pub trims: Vec<String>,
    /// Alternate spellings; merged into the same candidate set.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// In-memory candidate supplier backed by a JSON vocabulary.
///
/// Canonical trims come first, aliases after, so the canonical display form
/// wins when an alias normalizes identically.
#[derive(Debug, Default)]
pub struct VocabTable {
    sets: HashMap<(String, String), CandidateSet>,
}

impl VocabTable {
    pub fn from_entries(entries: Vec<VocabEntry>) -> Self {
        let mut sets: HashMap<(String, String), CandidateSet> = HashMap::new();
        for entry in entries {
            let key = (normalize(&entry.make), normalize(&entry.model));
            let set = sets.entry(key).or_default();
            for trim in entry.trims.into_iter().chain(entry.aliases) {
                if set.len() >= MAX_CANDIDATES {
                    warn!(
                        make = %entry.make,
                        model = %entry.model,
                        cap = MAX_CANDIDATES,
                        "vocabulary entry truncated"
                    );
                    break;
                }
                set.insert(trim);
            }
        }
        Self { sets }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<VocabEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }
}

impl CandidateSupplier for VocabTable {
    fn candidates(&self, make: &str, model: &str) -> Result<CandidateSet> {
        let key = (normalize(make), normalize(model));
        self.sets
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no vocabulary for {} {}", make, model)))
    }
}
