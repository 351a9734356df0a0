//! Bounded exponential backoff for transient collaborator failures.

use std::future::Future;
use std::time::Duration;

use cleanslate_config::RetryConfig;
use cleanslate_core::{CollaboratorError, CollaboratorResult};
use cleanslate_telemetry::Metrics;
use tracing::warn;

use crate::shutdown::Shutdown;

/// Retry schedule applied to transient collaborator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after `attempt` (1-based) failed.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }

    /// Policy that never retries.
    #[must_use]
    pub const fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(value: &RetryConfig) -> Self {
        Self {
            max_attempts: value.max_attempts.max(1),
            base_delay: value.base_delay,
            max_delay: value.max_delay,
        }
    }
}

/// Final outcome of a retried call with the number of attempts spent.
pub(crate) type Attempted<T> = Result<(T, u32), (CollaboratorError, u32)>;

/// Bound a collaborator call by `limit`, mapping expiry to a transient error.
pub(crate) async fn with_timeout<T, Fut>(
    operation: &'static str,
    limit: Duration,
    call: Fut,
) -> CollaboratorResult<T>
where
    Fut: Future<Output = CollaboratorResult<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(CollaboratorError::timeout(operation, limit)))
}

/// Invoke `call` until it succeeds, fails fatally, exhausts the policy or
/// shutdown is requested while backing off.
pub(crate) async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    shutdown: &Shutdown,
    metrics: &Metrics,
    mut call: F,
) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CollaboratorResult<T>>,
{
    let mut attempts = 0_u32;
    loop {
        attempts += 1;
        match call().await {
            Ok(value) => return Ok((value, attempts)),
            Err(err) if err.is_transient() && attempts < policy.max_attempts => {
                let delay = policy.delay_for(attempts);
                warn!(
                    operation,
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    detail = err.detail(),
                    "transient failure; backing off"
                );
                metrics.inc_collaborator_retry(operation);
                let mut stop = shutdown.clone();
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = stop.wait() => return Err((err, attempts)),
                }
            }
            Err(err) => return Err((err, attempts)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn transient_failures_retry_until_success() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let outcome = with_backoff(&policy(3), "upload", &Shutdown::never(), &metrics, || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CollaboratorError::transient("upload", "503"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(outcome, Ok(("done", 3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn fatal_failures_are_not_retried() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let outcome: Attempted<()> =
            with_backoff(&policy(5), "upload", &Shutdown::never(), &metrics, || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(CollaboratorError::fatal("upload", "bad remote")) }
            })
            .await;
        assert_eq!(
            outcome,
            Err((CollaboratorError::fatal("upload", "bad remote"), 1))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn attempts_are_bounded() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let outcome: Attempted<()> =
            with_backoff(&policy(3), "upload", &Shutdown::never(), &metrics, || async {
                Err(CollaboratorError::transient("upload", "503"))
            })
            .await;
        assert!(matches!(outcome, Err((_, 3))));
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_interrupts_backoff() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let (trigger, shutdown) = Shutdown::channel();
        trigger.trigger();
        let slow = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
        };
        let outcome: Attempted<()> = with_backoff(&slow, "upload", &shutdown, &metrics, || async {
            Err(CollaboratorError::transient("upload", "503"))
        })
        .await;
        assert!(matches!(outcome, Err((_, 1))));
        Ok(())
    }

    #[tokio::test]
    async fn timeouts_become_transient() {
        let outcome: CollaboratorResult<()> =
            with_timeout("strip", Duration::from_millis(5), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        let err = outcome.expect_err("call should time out");
        assert!(err.is_transient());
        assert_eq!(err.operation(), "strip");
    }
}
