/// AI Client: the single point of entry for all generative-model calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All model interactions MUST go through `AiClient::invoke`.
///
/// The client combines a system and a user prompt, takes a token from the
/// shared rate limiter, and retries failed attempts per `RetryPolicy`.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, warn};

pub mod gemini;
pub mod pacing;
pub mod prompts;
pub mod retry;
#[cfg(test)]
pub mod testing;

use self::pacing::{Sleeper, TokenBucket, TokioSleeper};
use self::retry::{RetryDecision, RetryPolicy, RetryState};

/// Failure of a single attempt against the remote model.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("rate limited by AI service: {0}")]
    RateLimited(String),

    #[error("AI service unavailable: {0}")]
    Unavailable(String),

    #[error("AI service rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed AI service response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Rate limits and outages are expected to clear on their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::RateLimited(_) | BackendError::Unavailable(_)
        )
    }
}

/// Terminal failure of an `AiClient::invoke` call.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service call failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("Invalid response structure from AI service: {0}")]
    MalformedResponse(String),
}

impl AiError {
    /// True when the remote service is unavailable (overloaded, down, or
    /// unreachable) rather than misconfigured or misbehaving.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Exhausted { source, .. } => source.is_transient(),
            AiError::MalformedResponse(_) => false,
        }
    }
}

/// Transport to a remote generative model. One call is one attempt.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;

    fn model(&self) -> &str;
}

/// The AI client used by the optimization pipeline.
#[derive(Clone)]
pub struct AiClient {
    backend: Arc<dyn GenerativeBackend>,
    sleeper: Arc<dyn Sleeper>,
    limiter: Option<Arc<TokenBucket>>,
    policy: RetryPolicy,
}

impl AiClient {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            sleeper: Arc::new(TokioSleeper),
            limiter: None,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<TokenBucket>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Sends `system` and `user` as one combined prompt and returns the raw
    /// model text. Retries happen here; callers must not retry again.
    pub async fn invoke(&self, system: &str, user: &str) -> Result<String, AiError> {
        let prompt = format!("{system}\n\n{user}");
        let mut state = RetryState::new(self.policy);

        loop {
            let attempt = state.start_attempt();
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            match self.backend.generate(&prompt).await {
                Ok(text) => {
                    debug!(
                        "AI call succeeded on attempt {}/{} ({} chars)",
                        attempt,
                        state.max_attempts(),
                        text.len()
                    );
                    return Ok(text);
                }
                Err(e) => match state.on_failure(e) {
                    RetryDecision::RetryAfter(delay) => {
                        if let Some(last) = state.last_error() {
                            warn!(
                                "AI call attempt {}/{} failed ({}), retrying in {}s",
                                attempt,
                                state.max_attempts(),
                                last,
                                delay.as_secs_f32()
                            );
                        }
                        self.sleeper.sleep(delay).await;
                    }
                    RetryDecision::GiveUp(err) => {
                        error!("AI call failed on attempt {}: {}", state.attempt(), err);
                        return Err(err);
                    }
                },
            }
        }
    }
}
