use crate::config::RetryPolicy;
use crate::error::{BackendError, RampError, Result};
use std::future::Future;
use tracing::{debug, warn};

/// Runs `op`, retrying transient backend failures with exponential backoff.
///
/// Non-transient failures are returned immediately as [`RampError::Backend`];
/// exhausting the retries yields [`RampError::NetworkTransient`].
pub async fn retry_with_backoff<T, F, Fut>(label: &str, policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, BackendError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(RampError::Backend(err)),
            Err(err) if attempt >= policy.max_retries => {
                warn!(label, attempts = attempt + 1, error = %err, "giving up");
                return Err(RampError::NetworkTransient {
                    attempts: attempt + 1,
                    source: err,
                });
            }
            Err(err) => {
                let delay = policy.delay(attempt);
                debug!(label, attempt, ?delay, error = %err, "retrying");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
