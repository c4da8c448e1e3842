//! Two-tier fuzzy trim matching
//!
//! Metrics are scored on a 0-100 scale like the usual fuzzy-matching
//! toolkits. The base ratio is normalized Levenshtein similarity (strsim);
//! `token_set_ratio` makes it word-order-insensitive and `partial_ratio`
//! rewards substring overlap, for queries that bury the trim inside a longer
//! title or description.
//!
//! Tier 1 scores the raw trim alone and demands the primary threshold.
//! Tier 2 widens the query with listing context and accepts a lower bar,
//! because the evidence is noisier.

use std::collections::BTreeSet;

use crate::candidates::CandidateSet;
use crate::method::AssignmentMethod;
use crate::models::{Listing, MatchResult};
use crate::normalize::{normalize, truncate_chars};

/// Characters of description offered to the tier-2 query when the listing has
/// neither a raw trim nor a title.
const DESCRIPTION_PREFIX_CHARS: usize = 300;

/// Plain similarity ratio on a 0-100 scale.
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Word-order-insensitive set similarity on a 0-100 scale.
///
/// Splits both strings into token sets, then compares the sorted intersection
/// against each side's sorted intersection-plus-remainder, taking the best
/// pairwise ratio. Identical token sets score 100 regardless of order.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return if tokens_a.is_empty() && tokens_b.is_empty() {
            100.0
        } else {
            0.0
        };
    }

    let join = |set: &BTreeSet<&str>| set.iter().copied().collect::<Vec<_>>().join(" ");

    let common: BTreeSet<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: BTreeSet<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: BTreeSet<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let base = join(&common);
    let rest_a = join(&only_a);
    let rest_b = join(&only_b);
    let combined_a = format!("{} {}", base, rest_a).trim().to_string();
    let combined_b = format!("{} {}", base, rest_b).trim().to_string();

    ratio(&base, &combined_a)
        .max(ratio(&base, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

/// Tier-1 scorer: the better of the plain ratio and the token-set ratio.
///
/// The plain component catches spacing variants ("s e plus" vs "se plus")
/// that tokenization tears apart; the set component keeps word order from
/// mattering.
pub fn trim_ratio(a: &str, b: &str) -> f64 {
    ratio(a, b).max(token_set_ratio(a, b))
}

/// Best-window substring similarity on a 0-100 scale.
///
/// Slides a window the length of the shorter string across the longer one and
/// returns the best plain ratio, so "se plus" inside "2019 camry se plus low
/// mileage" still scores high.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let long_chars: Vec<char> = long.chars().collect();
    let window = short.chars().count();
    let mut best: f64 = 0.0;

    for start in 0..=(long_chars.len() - window) {
        let slice: String = long_chars[start..start + window].iter().collect();
        best = best.max(ratio(short, &slice));
        if best >= 100.0 {
            break;
        }
    }

    best
}

/// Best (display candidate, score) for a query under one scorer.
///
/// The query and all candidates are compared in normalized form. Ties keep
/// the earliest candidate, so results are deterministic for a given supplier
/// ordering.
pub fn extract_best<F>(query: &str, candidates: &CandidateSet, scorer: F) -> Option<(String, f64)>
where
    F: Fn(&str, &str) -> f64,
{
    let query_norm = normalize(query);
    if query_norm.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in candidates.display_strings().iter().enumerate() {
        let score = scorer(&query_norm, &normalize(candidate));
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }

    best.map(|(idx, score)| (candidates.display_strings()[idx].clone(), score))
}

/// Top-`n` candidates for a query, scored with `token_set_ratio`, best first.
/// Ties keep supplier order.
pub fn rank_candidates(query: &str, candidates: &CandidateSet, n: usize) -> Vec<(String, f64)> {
    let query_norm = normalize(query);
    if query_norm.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(String, f64)> = candidates
        .display_strings()
        .iter()
        .map(|c| (c.clone(), token_set_ratio(&query_norm, &normalize(c))))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(n);
    scored
}

/// Two-tier fuzzy matcher with its acceptance thresholds (0-100).
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    pub primary_threshold: u8,
    pub secondary_threshold: u8,
}

impl FuzzyMatcher {
    pub fn new(primary_threshold: u8, secondary_threshold: u8) -> Self {
        Self {
            primary_threshold,
            secondary_threshold,
        }
    }

    /// Tier 1: order-insensitive similarity of the raw trim alone. Scores at
    /// the threshold are accepted.
    pub fn tier1(&self, raw_trim: &str, candidates: &CandidateSet) -> Option<MatchResult> {
        let (candidate, score) = extract_best(raw_trim, candidates, trim_ratio)?;
        if score >= self.primary_threshold as f64 {
            Some(MatchResult::matched(
                candidate,
                score / 100.0,
                AssignmentMethod::Fuzzy,
            ))
        } else {
            None
        }
    }

    /// Tier 2: raw trim widened with the title (or, if both are blank, a
    /// bounded description prefix), scored under both metrics; the single
    /// best pair across both competes against the lower threshold.
    pub fn tier2(&self, listing: &Listing, candidates: &CandidateSet) -> Option<MatchResult> {
        let query = Self::combined_query(listing)?;

        let set_best = extract_best(&query, candidates, token_set_ratio);
        let partial_best = extract_best(&query, candidates, partial_ratio);

        let (candidate, score) = match (set_best, partial_best) {
            (Some(s), Some(p)) => {
                if p.1 > s.1 {
                    p
                } else {
                    s
                }
            }
            (Some(s), None) => s,
            (None, Some(p)) => p,
            (None, None) => return None,
        };

        if score >= self.secondary_threshold as f64 {
            Some(MatchResult::matched(
                candidate,
                score / 100.0,
                AssignmentMethod::Fuzzy,
            ))
        } else {
            None
        }
    }

    fn combined_query(listing: &Listing) -> Option<String> {
        let raw = listing.raw_trim_trimmed();
        let title = listing.title.as_deref().unwrap_or("").trim();

        let mut query = format!("{} {}", raw, title).trim().to_string();
        if normalize(&query).is_empty() {
            let desc = listing.description.as_deref().unwrap_or("");
            query = truncate_chars(desc, DESCRIPTION_PREFIX_CHARS).to_string();
        }

        if normalize(&query).is_empty() {
            None
        } else {
            Some(query)
        }
    }
}
