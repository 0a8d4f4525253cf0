use std::time::Duration;
use thiserror::Error;

/// Errors crossing a capability boundary (text generation, neural search).
/// Rate limiting is a first-class kind so the retry executor can match on it
/// instead of inspecting message text.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited by upstream (retry after: {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("response contained no generated content")]
    EmptyResponse,

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CapabilityError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Server-advertised retry delay, when the upstream provided one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Pipeline-surface errors.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The extraction capability returned something that is not the expected
    /// claims JSON. Fatal for the run once retries are exhausted.
    #[error("claim extraction failed: {0}")]
    Extraction(String),

    /// The classification capability returned something that is not the
    /// expected verdict JSON. Phase 2 converts per-claim failures to a
    /// neutral fallback instead of surfacing this.
    #[error("entailment classification failed: {0}")]
    Classification(String),

    /// The one-shot pipeline exceeded its deadline. Surfaced distinctly so
    /// callers can suggest retrying with shorter input.
    #[error("verification timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Cache-backend errors. Callers treat the cache as fail-open: these are
/// logged and swallowed, never propagated.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}
