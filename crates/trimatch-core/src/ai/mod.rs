//! External trim classifier abstraction
//!
//! The classifier stage delegates ambiguous trims to a remote
//! chat-completions model and validates the answer against the candidate set.
//! The backend is pluggable behind a trait, with a concrete client enum for
//! Clone + compile-time dispatch.
//!
//! A backend never fails the pipeline: any network, format, or validation
//! problem degrades to an unmatched result and the orchestrator moves on to
//! the fuzzy stages. Failures are reported through `tracing`.
//!
//! # Configuration
//!
//! Environment variables:
//! - `PERPLEXITY_API_KEY` (or legacy `PERP_API_KEY`): bearer credential.
//!   Absent credential means the stage is skipped entirely, not an error.
//! - `TRIMATCH_LLM_URL`: chat-completions endpoint
//!   (default: `https://api.perplexity.ai/chat/completions`)
//! - `TRIMATCH_LLM_MODEL`: model identifier (default: `sonar`)

mod chat;
mod mock;
pub mod parsing;

pub use chat::{ChatBackend, ClassifierFailure};
pub use mock::MockBackend;

use std::sync::Arc;

use async_trait::async_trait;

use crate::candidates::CandidateSet;
use crate::models::{Listing, MatchResult};
use crate::rate_limit::RateLimiter;
use crate::resolver::ResolverConfig;

/// Trait defining the interface for trim classifier backends.
///
/// `assign` must uphold the stage contract: the returned trim, when present,
/// is a member of the candidate set (original display form) and the result
/// degrades to unmatched instead of erroring.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Map a listing to a canonical trim from the candidate set.
    async fn assign(&self, listing: &Listing, candidates: &CandidateSet) -> MatchResult;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> bool;

    /// Model identifier (for logging and metrics).
    fn model(&self) -> &str;

    /// Endpoint URL (for logging).
    fn host(&self) -> &str;
}

/// Concrete classifier client enum.
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ClassifierClient {
    /// OpenAI-style chat-completions backend (Perplexity by default).
    Chat(ChatBackend),
    /// Scripted mock backend for testing.
    Mock(MockBackend),
}

impl ClassifierClient {
    /// Create a client from environment variables.
    ///
    /// Returns None when no API credential is configured; the resolver then
    /// skips the classifier stage (fails open to fuzzy matching).
    pub fn from_env(rate_limiter: Arc<RateLimiter>, config: &ResolverConfig) -> Option<Self> {
        ChatBackend::from_env(rate_limiter, config).map(ClassifierClient::Chat)
    }

    /// Create a mock backend for testing.
    pub fn mock() -> Self {
        ClassifierClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl ClassifierBackend for ClassifierClient {
    async fn assign(&self, listing: &Listing, candidates: &CandidateSet) -> MatchResult {
        match self {
            ClassifierClient::Chat(b) => b.assign(listing, candidates).await,
            ClassifierClient::Mock(b) => b.assign(listing, candidates).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ClassifierClient::Chat(b) => b.health_check().await,
            ClassifierClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            ClassifierClient::Chat(b) => b.model(),
            ClassifierClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ClassifierClient::Chat(b) => b.host(),
            ClassifierClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_client_identity() {
        let client = ClassifierClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = ClassifierClient::mock();
        assert!(client.health_check().await);
    }
}
