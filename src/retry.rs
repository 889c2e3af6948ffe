//! Retry logic with capped exponential backoff
//!
//! The wait before retry `n` is `min(max_wait, min_wait * 2^(n-1))`, scaled by
//! a uniform jitter factor in `[0.5, 1.5)` and clamped to `max_wait` again.
//! With the defaults (5s / 6s) this keeps every wait between 2.5s and 6s, so a
//! run that hits rate limits slows down without stalling.
//!
//! # Example
//!
//! ```no_run
//! use leak_enricher::retry::{BackoffPolicy, IsRetryable, retry_with_backoff};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct Busy;
//!
//! impl std::fmt::Display for Busy {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "busy")
//!     }
//! }
//!
//! impl IsRetryable for Busy {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! # async fn example() {
//! let policy = BackoffPolicy {
//!     max_attempts: 3,
//!     min_wait: Duration::from_millis(100),
//!     max_wait: Duration::from_millis(200),
//!     jitter: true,
//! };
//! let outcome = retry_with_backoff(&policy, |_attempt| async { Ok::<_, Busy>(1) }).await;
//! assert_eq!(outcome.attempts.len(), 1);
//! # }
//! ```

use crate::config::FetchConfig;
use crate::error::Error;
use crate::types::{AttemptStatus, FetchAttempt};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;

    /// Attempt status recorded for this failure
    fn attempt_status(&self) -> AttemptStatus {
        if self.is_retryable() {
            AttemptStatus::Transient
        } else {
            AttemptStatus::Rejected
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Anything that went wrong on the wire; a malformed request never will succeed
            Error::Network(e) => !e.is_builder(),
            Error::RateLimited { .. } => true,
            Error::HttpStatus { status, .. } => *status >= 500,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    fn attempt_status(&self) -> AttemptStatus {
        match self {
            Error::RateLimited { .. } => AttemptStatus::RateLimited,
            Error::HttpStatus { status, .. } if *status >= 500 => AttemptStatus::ServerError,
            Error::Network(e) if e.is_timeout() => AttemptStatus::Timeout,
            Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => AttemptStatus::Timeout,
            e if e.is_retryable() => AttemptStatus::Transient,
            _ => AttemptStatus::Rejected,
        }
    }
}

/// Attempt budget and backoff bounds
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Total attempts allowed (first try included)
    pub max_attempts: u32,
    /// Base wait for the first retry
    pub min_wait: Duration,
    /// Cap applied before and after jitter
    pub max_wait: Duration,
    /// Scale waits by a random factor in `[0.5, 1.5)`
    pub jitter: bool,
}

impl BackoffPolicy {
    /// Policy matching a fetch configuration (jitter enabled)
    pub fn from_fetch_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            min_wait: config.min_wait,
            max_wait: config.max_wait,
            jitter: true,
        }
    }

    /// Un-jittered wait after the given 1-based attempt
    pub fn base_wait(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.min_wait.checked_mul(factor))
            .unwrap_or(self.max_wait)
            .min(self.max_wait)
    }

    /// Wait to sleep after the given 1-based attempt
    pub fn wait_for(&self, attempt: u32) -> Duration {
        let base = self.base_wait(attempt);
        if self.jitter {
            add_jitter(base).min(self.max_wait)
        } else {
            base
        }
    }
}

/// Failure of a retried operation
#[derive(Debug)]
pub enum RetryError<E> {
    /// A non-retryable error ended the loop
    Permanent(E),
    /// Every attempt failed with a retryable error; holds the last one
    Exhausted {
        /// Last error observed
        last: E,
        /// Attempts made
        attempts: u32,
    },
}

/// Result of [`retry_with_backoff`] plus the per-attempt log
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Final result
    pub result: Result<T, RetryError<E>>,
    /// One entry per attempt, in order
    pub attempts: Vec<FetchAttempt>,
}

/// Execute an async operation with capped exponential backoff
///
/// `operation` receives the 1-based attempt number. Retryable errors are
/// followed by a backoff sleep unless the attempt budget is used up; no sleep
/// happens after the final attempt.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &BackoffPolicy,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = Vec::with_capacity(max_attempts as usize);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                attempts.push(FetchAttempt {
                    attempt,
                    wait: None,
                    status: AttemptStatus::Success,
                });
                return RetryOutcome {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let wait = policy.wait_for(attempt);
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    "Attempt failed, backing off"
                );
                attempts.push(FetchAttempt {
                    attempt,
                    wait: Some(wait),
                    status: e.attempt_status(),
                });
                tokio::time::sleep(wait).await;
            }
            Err(e) if e.is_retryable() => {
                tracing::error!(
                    error = %e,
                    attempts = attempt,
                    "Operation failed after all retry attempts exhausted"
                );
                attempts.push(FetchAttempt {
                    attempt,
                    wait: None,
                    status: AttemptStatus::Exhausted,
                });
                return RetryOutcome {
                    result: Err(RetryError::Exhausted {
                        last: e,
                        attempts: attempt,
                    }),
                    attempts,
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, "Operation failed with non-retryable error");
                attempts.push(FetchAttempt {
                    attempt,
                    wait: None,
                    status: AttemptStatus::Rejected,
                });
                return RetryOutcome {
                    result: Err(RetryError::Permanent(e)),
                    attempts,
                };
            }
        }
    }
}

/// Scale a delay by a uniform factor in `[0.5, 1.5)`
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.5..1.5);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "transient error"),
                TestError::Permanent => write!(f, "permanent error"),
            }
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn fast_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            min_wait: Duration::from_millis(5),
            max_wait: Duration::from_millis(6),
            jitter: false,
        }
    }

    #[test]
    fn base_wait_doubles_then_caps() {
        let policy = BackoffPolicy {
            max_attempts: 5,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(5),
            jitter: false,
        };
        assert_eq!(policy.base_wait(1), Duration::from_secs(1));
        assert_eq!(policy.base_wait(2), Duration::from_secs(2));
        assert_eq!(policy.base_wait(3), Duration::from_secs(4));
        assert_eq!(policy.base_wait(4), Duration::from_secs(5));
        assert_eq!(policy.base_wait(100), Duration::from_secs(5));
    }

    #[test]
    fn default_bounds_cap_at_six_seconds() {
        let policy = BackoffPolicy::from_fetch_config(&FetchConfig::default());
        assert_eq!(policy.base_wait(1), Duration::from_secs(5));
        assert_eq!(policy.base_wait(2), Duration::from_secs(6));
    }

    #[test]
    fn jittered_wait_stays_within_bounds() {
        let policy = BackoffPolicy::from_fetch_config(&FetchConfig::default());
        for attempt in 1..=6 {
            for _ in 0..200 {
                let wait = policy.wait_for(attempt);
                let base = policy.base_wait(attempt);
                assert!(wait <= policy.max_wait, "wait {wait:?} above cap");
                assert!(
                    wait.as_secs_f64() >= base.as_secs_f64() * 0.5 - 1e-9,
                    "wait {wait:?} below half of base {base:?}"
                );
            }
        }
    }

    #[test]
    fn jitter_never_exceeds_one_and_a_half() {
        let delay = Duration::from_millis(100);
        for _ in 0..200 {
            let jittered = add_jitter(delay);
            assert!(jittered >= Duration::from_millis(50));
            assert!(jittered < Duration::from_millis(150));
        }
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let outcome = retry_with_backoff(&fast_policy(3), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(42)
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.attempts[0].status, AttemptStatus::Success);
    }

    #[tokio::test]
    async fn transient_then_success() {
        let outcome = retry_with_backoff(&fast_policy(3), |attempt| async move {
            if attempt < 3 {
                Err(TestError::Transient)
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), 3);
        let statuses: Vec<_> = outcome.attempts.iter().map(|a| a.status).collect();
        assert_eq!(
            statuses,
            vec![
                AttemptStatus::Transient,
                AttemptStatus::Transient,
                AttemptStatus::Success
            ]
        );
        assert_eq!(outcome.attempts[0].wait, Some(Duration::from_millis(5)));
        assert_eq!(outcome.attempts[1].wait, Some(Duration::from_millis(6)));
    }

    #[tokio::test]
    async fn exhaustion_reports_attempt_count() {
        let counter = Arc::new(AtomicU32::new(0));
        let outcome = retry_with_backoff(&fast_policy(2), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        match outcome.result {
            Err(RetryError::Exhausted { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        let last = outcome.attempts.last().unwrap();
        assert_eq!(last.status, AttemptStatus::Exhausted);
        assert_eq!(last.wait, None, "no sleep after the final attempt");
    }

    #[tokio::test]
    async fn permanent_error_stops_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let outcome = retry_with_backoff(&fast_policy(5), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Permanent)
            }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(matches!(
            outcome.result,
            Err(RetryError::Permanent(TestError::Permanent))
        ));
        assert_eq!(outcome.attempts[0].status, AttemptStatus::Rejected);
    }

    #[test]
    fn error_classification() {
        let limited = Error::RateLimited {
            url: "u".into(),
        };
        assert!(limited.is_retryable());
        assert_eq!(limited.attempt_status(), AttemptStatus::RateLimited);

        let server = Error::HttpStatus {
            status: 503,
            url: "u".into(),
        };
        assert!(server.is_retryable());
        assert_eq!(server.attempt_status(), AttemptStatus::ServerError);

        let missing = Error::HttpStatus {
            status: 404,
            url: "u".into(),
        };
        assert!(!missing.is_retryable());
        assert_eq!(missing.attempt_status(), AttemptStatus::Rejected);

        let timeout = Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"));
        assert_eq!(timeout.attempt_status(), AttemptStatus::Timeout);

        assert!(!Error::MissingId.is_retryable());
    }
}
