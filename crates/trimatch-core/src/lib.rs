//! Trimatch Core Library
//!
//! Resolves free-text vehicle trim strings scraped from marketplace listings
//! into a controlled, per make/model vocabulary of canonical trims:
//! - One canonical text normalization used by every stage
//! - Ordered matching pipeline: exact → external classifier → two-tier fuzzy
//! - Chat-completions classifier adapter with rate limiting, retry/backoff,
//!   and strict answer validation
//! - Canonical assignment-method vocabulary for audit consistency
//! - Concurrent batch resolution with incremental commit

pub mod ai;
pub mod audit;
pub mod batch;
pub mod candidates;
pub mod error;
pub mod fuzzy;
pub mod method;
pub mod models;
pub mod normalize;
pub mod rate_limit;
pub mod resolver;

/// Test utilities including a mock chat-completions server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{ChatBackend, ClassifierBackend, ClassifierClient, ClassifierFailure, MockBackend};
pub use audit::{AuditSink, ResolvedUpdate, CHANGED_BY_SYSTEM};
pub use batch::{BatchRunner, BatchSummary};
pub use candidates::{CandidateSet, CandidateSupplier, VocabEntry, VocabTable, MAX_CANDIDATES};
pub use error::{Error, Result};
pub use fuzzy::{rank_candidates, FuzzyMatcher};
pub use method::AssignmentMethod;
pub use models::{AuditRecord, Listing, MatchResult};
pub use normalize::normalize;
pub use rate_limit::{Backoff, RateLimiter};
pub use resolver::{ResolverConfig, TrimResolver};
