// Bounded retry for transient provider blocks
//
// The provider sometimes refuses listing requests for a while (rate limit,
// bot check). Those refusals are retried after a fixed backoff up to
// `max_attempts` times; any other error fails at once.
// The backoff wait is interrupted by the batch's cancellation token.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::config::BlockRetryConfig;
use super::errors::{DownloadError, JobError};

/// Run `operation` until it succeeds, fails permanently, exhausts the
/// attempt budget (`ProviderBlocked`), or `cancel` fires (`Cancelled`).
pub async fn retry_on_block<F, Fut, T>(
    config: &BlockRetryConfig,
    cancel: &CancellationToken,
    operation_name: &str,
    mut operation: F,
) -> Result<T, JobError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DownloadError>>,
{
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempts = attempt,
                        "Provider stopped blocking"
                    );
                }
                return Ok(value);
            }
            Err(e) if e.is_transient_block() => {
                if attempt >= config.max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        error = %e,
                        attempts = attempt,
                        "Provider still blocking, giving up"
                    );
                    return Err(JobError::ProviderBlocked { attempts: attempt });
                }

                tracing::warn!(
                    operation = operation_name,
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    backoff_secs = config.backoff.as_secs(),
                    "Blocked by provider, retrying after backoff"
                );

                tokio::select! {
                    _ = tokio::time::sleep(config.backoff) => {}
                    _ = cancel.cancelled() => return Err(JobError::Cancelled),
                }
            }
            Err(e) => {
                tracing::error!(operation = operation_name, error = %e, "Non-retryable provider error");
                return Err(JobError::Catalog(e));
            }
        }
    }
}
