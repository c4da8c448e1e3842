//! Chat-completions classifier backend
//!
//! Speaks the OpenAI chat-completions shape; the default endpoint is
//! Perplexity. All network discipline for the classifier stage lives here:
//! the shared rate-limiter gate in front of every attempt, exponential
//! backoff across retries, and strict validation of the model's answer
//! against the candidate set.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::candidates::CandidateSet;
use crate::method::AssignmentMethod;
use crate::models::{Listing, MatchResult};
use crate::normalize::truncate_chars;
use crate::rate_limit::{Backoff, RateLimiter};
use crate::resolver::ResolverConfig;

use super::parsing::parse_trim_answer;
use super::ClassifierBackend;

pub const DEFAULT_API_URL: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_MODEL: &str = "sonar";

/// Candidates offered to the model are capped to keep token usage sane.
/// Valid matches past the cap are unreachable by this stage; that is a
/// documented limitation, not a bug.
const MAX_PROMPT_CANDIDATES: usize = 300;
const TITLE_PROMPT_CHARS: usize = 180;
const DESCRIPTION_PROMPT_CHARS: usize = 1_000;

const MAX_ANSWER_TOKENS: u32 = 250;
const TEMPERATURE: f64 = 0.2;
const TOP_P: f64 = 0.9;

/// Why one classifier attempt failed.
///
/// Transient and format failures are retried with backoff; a validation
/// rejection or anything unexpected ends the stage immediately (retrying
/// cannot fix an invalid answer).
#[derive(Debug, Error)]
pub enum ClassifierFailure {
    #[error("transient: {0}")]
    Transient(String),

    #[error("response format: {0}")]
    Format(String),

    #[error("answer rejected: {0}")]
    Rejected(String),

    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl ClassifierFailure {
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ClassifierFailure::Transient(_) | ClassifierFailure::Format(_)
        )
    }
}

/// Chat-completions backend for trim classification.
pub struct ChatBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
    min_confidence: f64,
    max_retries: u32,
    backoff_base: Duration,
}

impl Clone for ChatBackend {
    fn clone(&self) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            rate_limiter: self.rate_limiter.clone(),
            min_confidence: self.min_confidence,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
        }
    }
}

impl ChatBackend {
    /// Create a backend. Retry, backoff, timeout, and acceptance settings
    /// come from the resolver config; the rate limiter is shared with every
    /// other caller in the process.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        rate_limiter: Arc<RateLimiter>,
        config: &ResolverConfig,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs_f64(config.request_timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            rate_limiter,
            min_confidence: config.min_classifier_confidence,
            max_retries: config.max_retries.max(1),
            backoff_base: Duration::from_secs_f64(config.backoff_base_seconds.max(0.0)),
        }
    }

    /// Create from environment variables. Returns None without a credential.
    pub fn from_env(rate_limiter: Arc<RateLimiter>, config: &ResolverConfig) -> Option<Self> {
        let api_key = std::env::var("PERPLEXITY_API_KEY")
            .or_else(|_| std::env::var("PERP_API_KEY"))
            .ok()?;
        let url = std::env::var("TRIMATCH_LLM_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let model = std::env::var("TRIMATCH_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Some(Self::new(&url, &model, &api_key, rate_limiter, config))
    }

    /// Render the classification prompt with bounded fields and the capped,
    /// numbered candidate list.
    fn build_prompt(&self, listing: &Listing, candidates: &CandidateSet) -> String {
        let title = truncate_chars(listing.title.as_deref().unwrap_or(""), TITLE_PROMPT_CHARS);
        let description = truncate_chars(
            listing.description.as_deref().unwrap_or(""),
            DESCRIPTION_PROMPT_CHARS,
        );
        let raw_trim = listing.raw_trim_trimmed();

        let lines: Vec<String> = candidates
            .display_strings()
            .iter()
            .take(MAX_PROMPT_CANDIDATES)
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t))
            .collect();

        format!(
            r#"You are an expert automotive analyst specializing in vehicle trim identification. Map the raw trim to the best canonical trim from the list. Choose ONLY from the list; do not invent names.

LISTING:
- Make: {make}
- Model: {model}
- Title: {title}
- Raw Trim: "{raw_trim}"
- Description: {description}

CANDIDATE TRIMS:
{candidates}

RULES:
1) Pick exactly one from the list above (or empty if no acceptable match).
2) Prefer precise matches (engine, drivetrain, edition) over superficial keywords.
3) If uncertain between close options, choose the more common/base trim.
4) If confidence < 0.40, return empty trim.
5) Never return "Other/Unknown/Generic".

RESPONSE (STRICT JSON):
{{
  "trim": "<exact candidate from list or empty string>",
  "confidence": <0.0 to 1.0>,
  "assignment_method": "LLM"
}}"#,
            make = listing.make,
            model = listing.model,
            title = title,
            raw_trim = raw_trim,
            description = description,
            candidates = lines.join("\n"),
        )
    }

    /// One attempt: call the API, extract the answer, validate it.
    async fn attempt(
        &self,
        prompt: &str,
        candidates: &CandidateSet,
    ) -> Result<MatchResult, ClassifierFailure> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt.to_string(),
            }],
            max_tokens: MAX_ANSWER_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
        };

        let response = self
            .http_client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ClassifierFailure::Transient(e.to_string())
                } else {
                    ClassifierFailure::Unexpected(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ClassifierFailure::Transient(format!("server {}", status)));
        }
        if !status.is_success() {
            return Err(ClassifierFailure::Unexpected(format!("status {}", status)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifierFailure::Format(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        debug!(model = %self.model, response = %content, "classifier response");

        let answer = parse_trim_answer(&content).ok_or_else(|| {
            ClassifierFailure::Format("response did not contain valid JSON".into())
        })?;

        if answer.trim.is_empty() {
            return Err(ClassifierFailure::Rejected("model declined".into()));
        }

        let Some(display) = candidates.get_by_normalized(&answer.trim) else {
            return Err(ClassifierFailure::Rejected(format!(
                "\"{}\" is not in the candidate set",
                answer.trim
            )));
        };
        if answer.confidence < self.min_confidence {
            return Err(ClassifierFailure::Rejected(format!(
                "confidence {:.2} below threshold {:.2}",
                answer.confidence, self.min_confidence
            )));
        }

        Ok(MatchResult::matched(
            display,
            answer.confidence,
            AssignmentMethod::Llm,
        ))
    }
}

#[async_trait]
impl ClassifierBackend for ChatBackend {
    async fn assign(&self, listing: &Listing, candidates: &CandidateSet) -> MatchResult {
        if candidates.is_empty() {
            return MatchResult::unmatched();
        }

        let prompt = self.build_prompt(listing, candidates);
        let mut backoff = Backoff::new(self.backoff_base);
        let mut last_failure: Option<ClassifierFailure> = None;

        for attempt in 1..=self.max_retries {
            self.rate_limiter.acquire().await;

            match self.attempt(&prompt, candidates).await {
                Ok(result) => return result,
                Err(failure) if failure.retryable() => {
                    let delay = backoff.next().unwrap_or_default();
                    warn!(
                        listing_id = %listing.id,
                        attempt,
                        max_retries = self.max_retries,
                        error = %failure,
                        backoff_ms = delay.as_millis() as u64,
                        "classifier call failed; backing off"
                    );
                    last_failure = Some(failure);
                    tokio::time::sleep(delay).await;
                }
                Err(ClassifierFailure::Rejected(reason)) => {
                    debug!(listing_id = %listing.id, %reason, "classifier answer rejected");
                    return MatchResult::unmatched();
                }
                Err(failure) => {
                    error!(listing_id = %listing.id, error = %failure, "classifier error");
                    return MatchResult::unmatched();
                }
            }
        }

        error!(
            listing_id = %listing.id,
            attempts = self.max_retries,
            last_error = %last_failure
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown".into()),
            "classifier failed after all retries"
        );
        MatchResult::unmatched()
    }

    async fn health_check(&self) -> bool {
        // Chat-completions APIs have no cheap ping; a HEAD against the
        // endpoint at least proves the host resolves and answers.
        self.http_client
            .head(&self.base_url)
            .send()
            .await
            .is_ok()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

/// Request to the chat-completions API.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from the chat-completions API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}
