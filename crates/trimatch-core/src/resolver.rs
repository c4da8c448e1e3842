//! Resolution orchestrator
//!
//! Linear stage machine with a single terminal acceptance rule: exact match,
//! then the external classifier (when enabled and configured), then the two
//! fuzzy tiers, then unmatched. The first stage that accepts wins; matching
//! failures never raise, they fall through.

use std::sync::Arc;

use tracing::debug;

use crate::ai::{ClassifierBackend, ClassifierClient};
use crate::candidates::CandidateSet;
use crate::fuzzy::FuzzyMatcher;
use crate::method::AssignmentMethod;
use crate::models::{Listing, MatchResult};
use crate::rate_limit::RateLimiter;

/// Recognized configuration surface of the pipeline. Every option gates a
/// behavior documented on its field.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Run the external classifier stage at all. Even when true, the stage
    /// silently skips if no API credential is configured.
    pub allow_external_classifier: bool,
    /// Fuzzy tier-1 acceptance threshold, 0-100 scale.
    pub fuzzy_primary_threshold: u8,
    /// Fuzzy tier-2 acceptance threshold, 0-100 scale. Lower than tier 1
    /// because the combined query is noisier evidence.
    pub fuzzy_secondary_threshold: u8,
    /// Minimum classifier confidence for an answer to be accepted.
    pub min_classifier_confidence: f64,
    /// Process-wide ceiling on classifier calls per second.
    pub max_queries_per_second: f64,
    /// Attempts per classifier call before degrading to unmatched.
    pub max_retries: u32,
    /// Base of the exponential backoff between retries, in seconds.
    pub backoff_base_seconds: f64,
    /// Per-request timeout for classifier calls, in seconds.
    pub request_timeout_seconds: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            allow_external_classifier: true,
            fuzzy_primary_threshold: 82,
            fuzzy_secondary_threshold: 74,
            min_classifier_confidence: 0.55,
            max_queries_per_second: 1.3,
            max_retries: 4,
            backoff_base_seconds: 0.75,
            request_timeout_seconds: 30.0,
        }
    }
}

/// The resolution pipeline.
///
/// Exact and fuzzy stages are pure and CPU-bound; the classifier stage is the
/// only one doing network I/O, and every call it makes funnels through the
/// single shared [`RateLimiter`].
pub struct TrimResolver {
    config: ResolverConfig,
    fuzzy: FuzzyMatcher,
    classifier: Option<ClassifierClient>,
}

impl TrimResolver {
    /// Build a resolver, picking up classifier credentials from the
    /// environment. With no credential the classifier stage is skipped.
    pub fn new(config: ResolverConfig) -> Self {
        let classifier = if config.allow_external_classifier {
            let limiter = Arc::new(RateLimiter::new(config.max_queries_per_second));
            ClassifierClient::from_env(limiter, &config)
        } else {
            None
        };
        Self::with_classifier(config, classifier)
    }

    /// Build a resolver around an explicit classifier (or none).
    pub fn with_classifier(config: ResolverConfig, classifier: Option<ClassifierClient>) -> Self {
        let fuzzy = FuzzyMatcher::new(
            config.fuzzy_primary_threshold,
            config.fuzzy_secondary_threshold,
        );
        Self {
            config,
            fuzzy,
            classifier,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn classifier_enabled(&self) -> bool {
        self.config.allow_external_classifier && self.classifier.is_some()
    }

    /// Resolve one listing against its candidate set.
    ///
    /// Always returns a result; an empty candidate set or a listing no stage
    /// can place comes back as unmatched with confidence 0.
    pub async fn resolve(&self, listing: &Listing, candidates: &CandidateSet) -> MatchResult {
        if candidates.is_empty() {
            debug!(listing_id = %listing.id, "empty candidate set; unmatched");
            return MatchResult::unmatched();
        }

        let raw_trim = listing.raw_trim_trimmed();

        // Stage 1: exact. Order-independent, no false positives by
        // construction.
        if !raw_trim.is_empty() {
            if let Some(display) = candidates.get_by_normalized(raw_trim) {
                return MatchResult::matched(display, 1.0, AssignmentMethod::Exact);
            }
        }

        // Stage 2: external classifier. Degrades to the fuzzy stages on any
        // failure or rejection.
        if self.config.allow_external_classifier {
            if let Some(classifier) = &self.classifier {
                let result = classifier.assign(listing, candidates).await;
                if result.is_matched() {
                    return result;
                }
                debug!(listing_id = %listing.id, "classifier stage unmatched; trying fuzzy");
            }
        }

        // Stages 3 and 4: fuzzy tiers.
        if !raw_trim.is_empty() {
            if let Some(result) = self.fuzzy.tier1(raw_trim, candidates) {
                return result;
            }
        }
        if let Some(result) = self.fuzzy.tier2(listing, candidates) {
            return result;
        }

        MatchResult::unmatched()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;

    fn candidates(items: &[&str]) -> CandidateSet {
        CandidateSet::from_display(items.iter().copied())
    }

    fn no_llm_config() -> ResolverConfig {
        ResolverConfig {
            allow_external_classifier: false,
            ..ResolverConfig::default()
        }
    }

    #[tokio::test]
    async fn test_exact_match_returns_candidate_casing() {
        let resolver = TrimResolver::with_classifier(no_llm_config(), None);
        let listing = Listing::new("a1", "Toyota", "Camry").with_raw_trim("se plus");
        let result = resolver
            .resolve(&listing, &candidates(&["SE Plus", "LE"]))
            .await;
        assert_eq!(result.trim.as_deref(), Some("SE Plus"));
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.method, AssignmentMethod::Exact);
    }

    #[tokio::test]
    async fn test_empty_candidates_short_circuit() {
        let resolver = TrimResolver::with_classifier(ResolverConfig::default(), None);
        let listing = Listing::new("a1", "Toyota", "Camry").with_raw_trim("SE");
        let result = resolver.resolve(&listing, &CandidateSet::new()).await;
        assert_eq!(result, MatchResult::unmatched());
    }

    #[tokio::test]
    async fn test_fuzzy_tier1_when_classifier_disabled() {
        let resolver = TrimResolver::with_classifier(no_llm_config(), None);
        let listing = Listing::new("a1", "Toyota", "Camry").with_raw_trim("S E Plus");
        let result = resolver
            .resolve(&listing, &candidates(&["SE Plus", "LE"]))
            .await;
        assert_eq!(result.trim.as_deref(), Some("SE Plus"));
        assert!(result.confidence >= 0.82);
        assert_eq!(result.method, AssignmentMethod::Fuzzy);
    }

    #[tokio::test]
    async fn test_nothing_matches_yields_unmatched() {
        let resolver = TrimResolver::with_classifier(no_llm_config(), None);
        let listing = Listing::new("a1", "Toyota", "Camry").with_raw_trim("xyz123");
        let result = resolver.resolve(&listing, &candidates(&["SE", "LE"])).await;
        assert_eq!(result, MatchResult::unmatched());
    }

    #[tokio::test]
    async fn test_classifier_accepted_before_fuzzy() {
        let mock = MockBackend::new();
        mock.push_response(MatchResult::matched("SE", 0.8, AssignmentMethod::Llm));
        let resolver = TrimResolver::with_classifier(
            ResolverConfig::default(),
            Some(ClassifierClient::Mock(mock.clone())),
        );
        // raw trim that neither exact- nor tier1-fuzzy-matches
        let listing = Listing::new("a1", "Toyota", "Camry").with_raw_trim("sport edition q");
        let result = resolver.resolve(&listing, &candidates(&["SE", "LE"])).await;
        assert_eq!(result.trim.as_deref(), Some("SE"));
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.method, AssignmentMethod::Llm);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_classifier_unmatched_falls_through_to_fuzzy() {
        let mock = MockBackend::new();
        // queue nothing: mock answers unmatched
        let resolver = TrimResolver::with_classifier(
            ResolverConfig::default(),
            Some(ClassifierClient::Mock(mock.clone())),
        );
        let listing = Listing::new("a1", "Toyota", "Camry").with_raw_trim("S E Plus");
        let result = resolver
            .resolve(&listing, &candidates(&["SE Plus", "LE"]))
            .await;
        assert_eq!(result.method, AssignmentMethod::Fuzzy);
        assert_eq!(result.trim.as_deref(), Some("SE Plus"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_exact_skips_classifier_entirely() {
        let mock = MockBackend::new();
        let resolver = TrimResolver::with_classifier(
            ResolverConfig::default(),
            Some(ClassifierClient::Mock(mock.clone())),
        );
        let listing = Listing::new("a1", "Toyota", "Camry").with_raw_trim("SE");
        let result = resolver.resolve(&listing, &candidates(&["SE", "LE"])).await;
        assert_eq!(result.method, AssignmentMethod::Exact);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_classifier_is_never_called() {
        let mock = MockBackend::new();
        mock.push_response(MatchResult::matched("SE", 0.9, AssignmentMethod::Llm));
        let resolver = TrimResolver::with_classifier(
            no_llm_config(),
            Some(ClassifierClient::Mock(mock.clone())),
        );
        let listing = Listing::new("a1", "Toyota", "Camry").with_raw_trim("zzz");
        let _ = resolver.resolve(&listing, &candidates(&["SE"])).await;
        assert_eq!(mock.call_count(), 0);
    }
}
