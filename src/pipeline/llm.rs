//! Upstream call wrapper: timeout and optional retry around a
//! [`ModelBackend`].
//!
//! ## Retry Strategy
//!
//! Retries are off by default (`max_retries = 0`); an upstream failure goes
//! straight back to the user, who can simply press the button again. When
//! enabled, the wait doubles after each attempt (`retry_backoff_ms * 2^n`).

use crate::backend::{ModelBackend, ModelReply, ModelRequest};
use crate::config::PipelineConfig;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Why an upstream call gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    /// Every attempt ran past `api_timeout_secs`.
    Timeout { secs: u64 },
    /// The last attempt returned this error.
    Failed(String),
}

/// Send `request`, honouring the configured timeout and retry policy.
///
/// `label` identifies the call in logs (e.g. `extract:notes.pdf`).
pub async fn call_model(
    backend: &dyn ModelBackend,
    request: &ModelRequest,
    config: &PipelineConfig,
    label: &str,
) -> Result<ModelReply, CallFailure> {
    let start = Instant::now();
    let limit = Duration::from_secs(config.api_timeout_secs);
    let mut last = CallFailure::Failed("no attempt made".into());

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                label, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(limit, backend.complete(request)).await {
            Ok(Ok(reply)) => {
                debug!(
                    "{}: answered by {} in {:?} ({} chars)",
                    label,
                    backend.name(),
                    start.elapsed(),
                    reply.content.len()
                );
                return Ok(reply);
            }
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", label, attempt + 1, e);
                last = CallFailure::Failed(e.message);
            }
            Err(_) => {
                warn!(
                    "{}: attempt {} timed out after {}s",
                    label,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last = CallFailure::Timeout {
                    secs: config.api_timeout_secs,
                };
            }
        }
    }

    Err(last)
}

/// Longest single wait between attempts.
const MAX_BACKOFF_MS: u64 = 60_000;

/// `base * 2^(attempt - 1)`, saturating and capped at [`MAX_BACKOFF_MS`].
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF_MS)
}
