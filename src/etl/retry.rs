//! Bounded retry envelope shared by every pipeline phase

use crate::error::{EtlError, ErrorKind};
use owo_colors::OwoColorize;
use std::future::Future;
use std::time::Duration;

/// Parameters of the retry envelope
///
/// The delay between attempts is fixed; there is no backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per phase before it is exhausted (at least one is always made)
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one
    pub delay: Duration,
    /// Upper bound on a single attempt, `None` waits indefinitely
    pub attempt_timeout: Option<Duration>,
    /// Stop at the first schema error instead of retrying it
    pub fail_fast_on_schema: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            delay: Duration::from_secs(3),
            attempt_timeout: Some(Duration::from_secs(300)),
            fail_fast_on_schema: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            ..Self::default()
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_fail_fast_on_schema(mut self, fail_fast: bool) -> Self {
        self.fail_fast_on_schema = fail_fast;
        self
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn is_retryable(&self, error: &EtlError) -> bool {
        !(self.fail_fast_on_schema && error.kind() == ErrorKind::Schema)
    }
}

/// Terminal state of a retry envelope
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { error: EtlError, attempts: u32 },
}

impl<T> RetryOutcome<T> {
    /// Number of times the operation was invoked
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }

    pub fn into_result(self) -> Result<T, EtlError> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Exhausted { error, .. } => Err(error),
        }
    }
}

/// Invoke `op` until it succeeds or the policy gives up
///
/// Every failed attempt is logged with its counter. The policy's delay is
/// slept between attempts but never after the last one. With an attempt
/// timeout set, a hung attempt is abandoned and counts as a timeout failure.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EtlError>>,
{
    let max = policy.attempts();
    let mut attempt = 1;

    loop {
        log::info!("{} attempt {}/{}", label.cyan(), attempt, max);

        let result = match policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, op()).await {
                Ok(result) => result,
                Err(_) => Err(EtlError::Timeout {
                    phase: label.to_string(),
                    after: limit,
                }),
            },
            None => op().await,
        };

        let error = match result {
            Ok(value) => {
                log::debug!("{} succeeded after {} attempt(s)", label, attempt);
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                };
            }
            Err(error) => error,
        };

        log::warn!("{} failed on attempt {}/{}: {}", label, attempt, max, error);

        if !policy.is_retryable(&error) {
            log::error!("{} failed with a non-retryable {:?} error", label, error.kind());
            return RetryOutcome::Exhausted {
                error,
                attempts: attempt,
            };
        }
        if attempt >= max {
            log::error!("{} exhausted after {} attempt(s)", label, attempt);
            return RetryOutcome::Exhausted {
                error,
                attempts: attempt,
            };
        }

        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}
