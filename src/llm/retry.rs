//! Generic retry combinator for external-call sites.

use std::future::Future;
use std::time::Duration;

/// Run `op` up to `max_attempts` times with exponential backoff.
///
/// The backoff doubles per attempt starting from `base_backoff`. The final
/// error is returned to the caller, which decides how to degrade (empty
/// patch, canned text) — errors are never swallowed here.
pub async fn with_retry<T, E, F, Fut>(
    mut op: F,
    max_attempts: u32,
    base_backoff: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    debug_assert!(max_attempts > 0);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let backoff = base_backoff * 2u32.saturating_pow(attempt - 1);
                tracing::warn!(attempt, backoff_ms = backoff.as_millis() as u64, error = %e, "retrying external call");
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
