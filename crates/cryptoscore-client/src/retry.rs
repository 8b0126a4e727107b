//! Retry loop for transport calls.

use std::future::Future;

use tokio::time::sleep;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::ClientError;
use crate::transport::TransportError;

/// Run `operation` until it succeeds, fails permanently, or `policy` runs
/// out of attempts.
///
/// Only [`TransportError::is_transient`] failures are retried. Anything else
/// is returned on first sight as [`ClientError::Transport`]. Exhaustion
/// yields [`ClientError::Transient`] carrying the attempt count.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    name: &'static str,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => {
                return Err(ClientError::Transport {
                    operation: name,
                    source: e,
                })
            }
            Err(e) => {
                let retrying = attempt < max_attempts;
                let delay = policy.delay_for_attempt(attempt - 1);
                warn!(
                    operation = name,
                    attempt,
                    max_attempts,
                    retrying,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient transport failure"
                );
                if !retrying {
                    return Err(ClientError::Transient {
                        operation: name,
                        attempts: attempt,
                        source: e,
                    });
                }
                sleep(delay).await;
            }
        }
    }
}
