//! Bounded retry with per-attempt timeout for collaborator calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use seatkeeper_core::config::CollaboratorConfig;

use crate::error::ClientError;

/// Fixed attempt count, fixed backoff, and a timeout on every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
    /// Upper bound on one attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Policy from the `collaborators` configuration section.
    pub fn from_config(config: &CollaboratorConfig) -> Self {
        Self {
            max_attempts: config.retry.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry.backoff_millis),
            timeout: Duration::from_secs(config.timeout_seconds.max(1)),
        }
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// the attempts are exhausted.
    ///
    /// A timed-out attempt counts as an [`ClientError::Unavailable`] failure.
    pub async fn run<T, F, Fut>(
        &self,
        service: &'static str,
        operation: &str,
        mut call: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::unavailable(
                    service,
                    format!("{operation} timed out after {:?}", self.timeout),
                )),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(
                        service,
                        operation,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Collaborator call failed, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(200),
            timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = policy
            .run("identity", "find_by_id", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ClientError::unavailable("identity", "connection refused"))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failed_attempt() {
        let policy = RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(10),
            timeout: Duration::from_secs(1),
        };
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = policy
            .run("billing", "cancel_subscription", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(ClientError::Unavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = policy
            .run("identity", "create_account", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::Rejected {
                        service: "identity",
                        status: 409,
                        message: "duplicate email".into(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(ClientError::Rejected { status: 409, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
