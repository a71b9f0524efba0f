use std::fmt::Display;
use std::future::Future;

use tracing::warn;

use super::StorageError;
use crate::retry::RetryPolicy;

/// Runs `op` until it succeeds, each attempt bounded by `policy.timeout`.
/// Timeouts and errors both count as failed attempts; exhaustion surfaces as
/// `StorageError::Unavailable`.
pub async fn with_retry<T, E, F, Fut>(
    backend: &str,
    operation: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, StorageError>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts();
    let mut last_error = String::new();

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = policy.delay_before(attempt);
            warn!(
                backend,
                operation,
                attempt,
                error = %last_error,
                "Backend call failed, retrying after {}ms",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => {
                last_error = format!("timed out after {}ms", policy.timeout.as_millis())
            }
        }
    }

    Err(StorageError::unavailable(
        backend,
        format!("{operation} failed after {attempts} attempts: {last_error}"),
    ))
}
