//! Rate-limit-aware retry execution.
//!
//! Every external-call site goes through [`execute_with_retry`]: rate-limit
//! errors are retried with exponential backoff (or the server's advertised
//! retry-after delay when one is present), anything else propagates
//! immediately. Backoff is deterministic (no jitter) so call latency is
//! assertable in tests.

use std::future::Future;
use std::time::Duration;

use regex::Regex;
use tokio_retry::strategy::ExponentialBackoff;

use crate::config::RetryConfig;
use crate::error::CapabilityError;

/// Classification hooks the executor needs from an error type.
pub trait Retryable {
    fn is_rate_limited(&self) -> bool;

    /// Server-advertised delay that overrides the computed backoff for the
    /// current attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for CapabilityError {
    fn is_rate_limited(&self) -> bool {
        CapabilityError::is_rate_limited(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        CapabilityError::retry_after(self)
    }
}

/// Run `op`, retrying rate-limited failures up to `policy.max_retries` times.
/// Attempt `n` (0-based) waits `initial_delay_ms * 2^n` (odd millisecond
/// values round up to even), unless the error carries a retry-after hint. The
/// last error propagates once the schedule is exhausted; non-rate-limit
/// errors propagate without any retry.
pub async fn execute_with_retry<T, E, F, Fut>(policy: &RetryConfig, mut op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    // from_millis(2) doubles per attempt; the factor scales the schedule to
    // initial_delay_ms * 2^n, with odd delays rounded up to the next even
    // millisecond before halving into the factor.
    let initial = policy.initial_delay_ms + (policy.initial_delay_ms & 1);
    let mut schedule = ExponentialBackoff::from_millis(2)
        .factor(initial / 2)
        .max_delay(Duration::from_secs(60))
        .take(policy.max_retries);

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() => {
                let computed = match schedule.next() {
                    Some(d) => d,
                    None => {
                        tracing::warn!(
                            max_retries = policy.max_retries,
                            error = %e,
                            "Rate-limit retries exhausted"
                        );
                        return Err(e);
                    }
                };
                let delay = e.retry_after().unwrap_or(computed);
                tracing::warn!(
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited upstream, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Parse a server retry hint: a duration string like `"17s"` (as seen inside
/// quota-error messages) or a bare seconds value (`Retry-After: 17`).
pub fn parse_retry_hint(text: &str) -> Option<Duration> {
    if let Ok(re) = Regex::new(r"(\d+)\s*s") {
        if let Some(caps) = re.captures(text) {
            if let Ok(secs) = caps[1].parse::<u64>() {
                return Some(Duration::from_secs(secs));
            }
        }
    }
    text.trim().parse::<u64>().ok().map(Duration::from_secs)
}
