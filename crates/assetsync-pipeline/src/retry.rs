//! Exponential backoff for transient fetch and upload failures.
//!
//! Callers supply the retriability predicate; anything it rejects is
//! returned immediately without sleeping.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

const MAX_DELAY_MS: u64 = 30_000;

/// Executes `operation`, retrying up to `max_retries` additional times while
/// `is_retriable` accepts the error.
///
/// The sleep before retry `n` (1-based) is `backoff_base_ms * 2^(n-1)`,
/// capped at 30 s, with ±25 % jitter. With `max_retries = 2` the operation
/// runs at most 3 times. After the last attempt the last error is returned.
pub(crate) async fn retry_with_backoff<T, E, F, Fut, P>(
    max_retries: u32,
    backoff_base_ms: u64,
    is_retriable: P,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient error, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
