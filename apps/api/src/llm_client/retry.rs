//! Retry state machine for AI calls.
//!
//! The client loop owns a `RetryState`, starts an attempt, and on failure
//! asks the state what to do next: wait and retry, or give up with a
//! classified `AiError`. Sleeping is the caller's job so tests can record
//! the delays instead of waiting them out.

use std::time::Duration;

use super::{AiError, BackendError};

/// Total attempts per invocation, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Rate limits wait `unit * 2^attempt`; other errors wait `unit * attempt`.
    pub unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            unit: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp(AiError),
}

#[derive(Debug)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    last_error: Option<BackendError>,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            last_error: None,
        }
    }

    /// Advances to the next attempt and returns its 1-based number.
    pub fn start_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    pub fn last_error(&self) -> Option<&BackendError> {
        self.last_error.as_ref()
    }

    fn is_final_attempt(&self) -> bool {
        self.attempt >= self.policy.max_attempts
    }

    /// Classifies a failed attempt.
    ///
    /// Malformed replies are terminal on any attempt. Everything else is
    /// retried until the final attempt, which names the attempt count.
    pub fn on_failure(&mut self, error: BackendError) -> RetryDecision {
        if let BackendError::Malformed(detail) = &error {
            return RetryDecision::GiveUp(AiError::MalformedResponse(detail.clone()));
        }

        if self.is_final_attempt() {
            return RetryDecision::GiveUp(AiError::Exhausted {
                attempts: self.attempt,
                source: error,
            });
        }

        let delay = match error {
            BackendError::RateLimited(_) => self.policy.unit * 2u32.pow(self.attempt),
            _ => self.policy.unit * self.attempt,
        };
        self.last_error = Some(error);

        RetryDecision::RetryAfter(delay)
    }
}
