//! Mock classifier backend for testing

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::candidates::CandidateSet;
use crate::models::{Listing, MatchResult};

use super::ClassifierBackend;

/// Scriptable classifier: answers are queued ahead of time and popped per
/// call; an empty queue answers unmatched. Calls are counted.
#[derive(Clone, Default)]
pub struct MockBackend {
    responses: Arc<Mutex<VecDeque<MatchResult>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next answer.
    pub fn push_response(&self, result: MatchResult) {
        self.responses.lock().unwrap().push_back(result);
    }

    /// Number of `assign` calls so far.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ClassifierBackend for MockBackend {
    async fn assign(&self, _listing: &Listing, _candidates: &CandidateSet) -> MatchResult {
        *self.calls.lock().unwrap() += 1;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(MatchResult::unmatched)
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
