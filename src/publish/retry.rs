use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

use crate::error::PipelineError;

/// One bulk write per run keeps the policy simple: a fixed pause, a fixed
/// attempt cap, no backoff.
pub const MAX_ATTEMPTS: usize = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Runs `op`, retrying only on [`PipelineError::Transient`]. Any other error
/// propagates immediately; spending all attempts yields
/// [`PipelineError::RetryExhausted`].
pub async fn retry_api_call<F, Fut, T>(op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with(op, MAX_ATTEMPTS, RETRY_DELAY).await
}

pub async fn retry_with<F, Fut, T>(mut op: F, attempts: usize, delay: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=attempts {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match e.downcast_ref::<PipelineError>() {
                Some(PipelineError::Transient { status }) => {
                    warn!(
                        status = *status,
                        attempt, attempts, "transient API error, retrying"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
                _ => return Err(e),
            },
        }
    }
    Err(PipelineError::RetryExhausted { attempts }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn transient() -> anyhow::Error {
        PipelineError::Transient { status: 500 }.into()
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_after_two_transients() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let result = retry_with(
            move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(transient())
                    } else {
                        Ok(n)
                    }
                }
            },
            3,
            Duration::from_millis(1),
        )
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let err = retry_with(
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(transient())
                }
            },
            3,
            Duration::from_millis(1),
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::RetryExhausted { attempts: 3 })
        ));
    }

    #[tokio::test]
    async fn non_transient_errors_propagate_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let err = retry_with(
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow!("permission denied"))
                }
            },
            3,
            Duration::from_millis(1),
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(err.to_string().contains("permission denied"));
    }

    #[tokio::test]
    async fn first_try_success_makes_one_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let result = retry_with(
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            },
            3,
            Duration::from_millis(1),
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
