//! Neural-search capability.
//!
//! Provides the `EvidenceSearch` trait with implementations for:
//! - **Exa**: neural web search with generated highlights
//! - **Mock**: scripted hits for tests
//!
//! Like the generation clients, these are single-shot: rate limiting comes
//! back as `CapabilityError::RateLimited` and callers own the retry policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::error::CapabilityError;
use crate::retry::parse_retry_hint;

// ============================================================================
// EvidenceSearch trait
// ============================================================================

/// One raw hit from the search capability, before quality filtering.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Per-call search parameters.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub num_results: usize,
    pub max_characters: usize,
    pub highlight_sentences: usize,
    pub highlights_per_url: usize,
    /// Highlights are generated against this query (the claim itself, not
    /// the filler-stripped search query).
    pub highlight_query: String,
}

#[async_trait]
pub trait EvidenceSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, CapabilityError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Exa API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest {
    query: String,
    num_results: usize,
    #[serde(rename = "type")]
    search_type: &'static str,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    text: ExaTextOptions,
    highlights: ExaHighlightOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaTextOptions {
    max_characters: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaHighlightOptions {
    num_sentences: usize,
    highlights_per_url: usize,
    query: String,
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    results: Vec<SearchHit>,
}

fn parse_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match &value["error"] {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(o) => o
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from),
        _ => None,
    }
}

// ============================================================================
// ExaSearchClient
// ============================================================================

/// Exa neural-search client.
#[derive(Debug, Clone)]
pub struct ExaSearchClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ExaSearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self, CapabilityError> {
        Self::with_base_url(config, "https://api.exa.ai".to_string())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: &SearchConfig,
        base_url: String,
    ) -> Result<Self, CapabilityError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("EXA_API_KEY").ok())
            .unwrap_or_default();
        if api_key.is_empty() {
            return Err(CapabilityError::MissingApiKey("EXA_API_KEY"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    async fn search_once(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, CapabilityError> {
        let url = format!("{}/search", self.base_url);

        let request = ExaRequest {
            query: query.to_string(),
            num_results: options.num_results,
            search_type: "neural",
            contents: ExaContents {
                text: ExaTextOptions {
                    max_characters: options.max_characters,
                },
                highlights: ExaHighlightOptions {
                    num_sentences: options.highlight_sentences,
                    highlights_per_url: options.highlights_per_url,
                    query: options.highlight_query.clone(),
                },
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let header_hint = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_hint);
            let error_body = response.text().await.unwrap_or_default();
            let message = parse_error_message(&error_body).unwrap_or(error_body);

            if status.as_u16() == 429 || message.contains("Too Many Requests") {
                let retry_after = header_hint.or_else(|| parse_retry_hint(&message));
                tracing::warn!(retry_after = ?retry_after, "Exa rate limit hit");
                return Err(CapabilityError::RateLimited { retry_after });
            }

            tracing::error!(status = status.as_u16(), message = %message, "Exa API error");
            return Err(CapabilityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ExaResponse = response.json().await?;
        Ok(parsed.results)
    }
}

#[async_trait]
impl EvidenceSearch for ExaSearchClient {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, CapabilityError> {
        self.search_once(query, options).await
    }

    fn name(&self) -> &str {
        "exa"
    }
}

// ============================================================================
// MockSearch
// ============================================================================

/// Scripted search backend for tests: hits are matched by query substring,
/// queued failures are returned first, and every call is counted.
#[derive(Default)]
pub struct MockSearch {
    hits: std::sync::Mutex<Vec<(String, Vec<SearchHit>)>>,
    failures: std::sync::Mutex<Vec<CapabilityError>>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `hits` whenever the query contains `needle`. Unmatched queries
    /// return no hits.
    pub fn with_hits(self, needle: &str, hits: Vec<SearchHit>) -> Self {
        self.hits
            .lock()
            .unwrap()
            .push((needle.to_string(), hits));
        self
    }

    /// Fail the next call with `error` (FIFO when queued repeatedly).
    pub fn push_failure(&self, error: CapabilityError) {
        self.failures.lock().unwrap().push(error);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Convenience constructor for scripted hits.
pub fn hit(url: &str, title: &str, text: &str, score: f32) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: Some(title.to_string()),
        text: Some(text.to_string()),
        highlights: Vec::new(),
        score,
        published_date: None,
        author: None,
    }
}

#[async_trait]
impl EvidenceSearch for MockSearch {
    async fn search(
        &self,
        query: &str,
        _options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, CapabilityError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        {
            let mut failures = self.failures.lock().unwrap();
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }

        let hits = self.hits.lock().unwrap();
        for (needle, scripted) in hits.iter() {
            if query.contains(needle) {
                return Ok(scripted.clone());
            }
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// TESTS
// ============================================================================
