//! Retry coordinator: bounded exponential backoff around one idempotent
//! fetch.

use std::future::Future;
use std::time::Duration;

use crate::config::MAX_BACKOFF;
use crate::error::HarvestError;

/// Run `op` with up to `max_retries` retries after the initial attempt.
///
/// Only errors classified retryable ([`HarvestError::is_retryable`]) are
/// retried; a terminal failure returns immediately. The wait before retry
/// `n` is `base_delay * 2^n`, capped at [`MAX_BACKOFF`]. After exhausting
/// the attempts the last error is returned to the caller, never escalated.
pub async fn with_retry<T, F, Fut>(
    mut op: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, HarvestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HarvestError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                let delay = backoff_delay(base_delay, attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    wait_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// `base * 2^attempt`, capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(1u32 << attempt.min(31))
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}
