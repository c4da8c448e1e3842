//! Assignment method vocabulary
//!
//! Resolution methods form a closed set so that audit history stays comparable
//! across versions and across sources (pipeline output, manual review tooling,
//! legacy imports). Free-form labels are folded into the set through an
//! explicit keyword table rather than ad-hoc substring checks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

/// How a trim resolution was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentMethod {
    /// Normalized raw trim equals a candidate exactly.
    #[serde(rename = "exact")]
    Exact,
    /// Assigned by a human reviewer.
    #[serde(rename = "manual")]
    Manual,
    /// Assigned by the external classifier and validated against candidates.
    #[serde(rename = "LLM")]
    Llm,
    /// Assigned by approximate string similarity.
    #[serde(rename = "fuzzy")]
    Fuzzy,
    /// No stage accepted a candidate.
    #[serde(rename = "unmatched")]
    Unmatched,
}

/// Keyword table folding arbitrary method labels into the canonical set.
///
/// Checked in declared order against the normalized label; the first keyword
/// contained in the label wins. Anything that matches nothing is `Unmatched`.
const METHOD_ALIASES: &[(&str, AssignmentMethod)] = &[
    ("manual", AssignmentMethod::Manual),
    ("llm", AssignmentMethod::Llm),
    ("ai", AssignmentMethod::Llm),
    ("exact", AssignmentMethod::Exact),
    ("fuzzy", AssignmentMethod::Fuzzy),
    ("rule", AssignmentMethod::Fuzzy),
    ("heuristic", AssignmentMethod::Fuzzy),
    ("mapping", AssignmentMethod::Fuzzy),
    ("closest", AssignmentMethod::Fuzzy),
];

impl AssignmentMethod {
    /// Canonical wire/audit label.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentMethod::Exact => "exact",
            AssignmentMethod::Manual => "manual",
            AssignmentMethod::Llm => "LLM",
            AssignmentMethod::Fuzzy => "fuzzy",
            AssignmentMethod::Unmatched => "unmatched",
        }
    }

    /// Fold a free-form label (legacy audit rows, classifier output, review
    /// tooling) into the canonical vocabulary.
    pub fn from_label(label: &str) -> Self {
        let key = normalize(label);
        // "ai" must match as a token, not inside e.g. "maintained"
        for (keyword, method) in METHOD_ALIASES {
            let hit = if keyword.len() <= 2 {
                key.split(' ').any(|tok| tok == *keyword)
            } else {
                key.contains(keyword)
            };
            if hit {
                return *method;
            }
        }
        AssignmentMethod::Unmatched
    }
}

impl fmt::Display for AssignmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_labels_roundtrip() {
        for m in [
            AssignmentMethod::Exact,
            AssignmentMethod::Manual,
            AssignmentMethod::Llm,
            AssignmentMethod::Fuzzy,
            AssignmentMethod::Unmatched,
        ] {
            assert_eq!(AssignmentMethod::from_label(m.as_str()), m);
        }
    }

    #[test]
    fn test_legacy_labels_fold() {
        assert_eq!(
            AssignmentMethod::from_label("manual_review"),
            AssignmentMethod::Manual
        );
        assert_eq!(
            AssignmentMethod::from_label("AI classifier v2"),
            AssignmentMethod::Llm
        );
        assert_eq!(
            AssignmentMethod::from_label("closest-match"),
            AssignmentMethod::Fuzzy
        );
        assert_eq!(
            AssignmentMethod::from_label("rule_based_mapping"),
            AssignmentMethod::Fuzzy
        );
        assert_eq!(
            AssignmentMethod::from_label("something else"),
            AssignmentMethod::Unmatched
        );
    }

    #[test]
    fn test_manual_wins_over_fuzzy_keywords() {
        // table order is part of the contract
        assert_eq!(
            AssignmentMethod::from_label("manual closest pick"),
            AssignmentMethod::Manual
        );
    }

    #[test]
    fn test_ai_matches_as_token_only() {
        assert_eq!(
            AssignmentMethod::from_label("maintained"),
            AssignmentMethod::Unmatched
        );
        assert_eq!(AssignmentMethod::from_label("ai"), AssignmentMethod::Llm);
    }

    #[test]
    fn test_serde_labels() {
        assert_eq!(
            serde_json::to_string(&AssignmentMethod::Llm).unwrap(),
            "\"LLM\""
        );
        assert_eq!(
            serde_json::from_str::<AssignmentMethod>("\"fuzzy\"").unwrap(),
            AssignmentMethod::Fuzzy
        );
    }
}
