//! Text-generation capability.
//!
//! Provides the `TextGenerator` trait with implementations for:
//! - **Groq**: OpenAI-compatible chat completions, used for both claim
//!   extraction and entailment classification
//! - **Mock**: scripted responses for tests
//!
//! Clients are single-shot: rate limiting surfaces as a typed
//! `CapabilityError::RateLimited` and callers decide the retry policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::CapabilityError;
use crate::retry::parse_retry_hint;

// ============================================================================
// TextGenerator trait
// ============================================================================

/// Abstraction over text-generation providers. Implementations return the
/// raw completion text; prompt construction and JSON parsing belong to the
/// callers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Completions are expected to contain exactly one JSON object, usually
/// surrounded by prose or markdown fences. Returns the outermost braces and
/// everything between them.
pub(crate) fn first_json_object(response: &str) -> Option<&str> {
    let re = regex::Regex::new(r"(?s)\{.*\}").ok()?;
    re.find(response).map(|m| m.as_str())
}

// ============================================================================
// Groq API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GroqErrorResponse {
    error: Option<GroqErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GroqErrorDetail {
    message: String,
}

fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<GroqErrorResponse>(body)
        .ok()
        .and_then(|e| e.error)
        .map(|d| d.message)
}

// ============================================================================
// GroqGenerationClient
// ============================================================================

/// Groq chat-completions client.
#[derive(Debug, Clone)]
pub struct GroqGenerationClient {
    client: Client,
    config: GenerationConfig,
    api_key: String,
    base_url: String,
}

impl GroqGenerationClient {
    pub fn new(config: GenerationConfig) -> Result<Self, CapabilityError> {
        Self::with_base_url(config, "https://api.groq.com".to_string())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: GenerationConfig,
        base_url: String,
    ) -> Result<Self, CapabilityError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .unwrap_or_default();
        if api_key.is_empty() {
            return Err(CapabilityError::MissingApiKey("GROQ_API_KEY"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
            base_url,
        })
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, CapabilityError> {
        let url = format!("{}/openai/v1/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
                tracing::warn!(retry_after = ?retry_after, "Groq rate limit hit");
                return Err(CapabilityError::RateLimited { retry_after });
            }

            tracing::error!(status = status.as_u16(), message = %message, "Groq API error");
            return Err(CapabilityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(CapabilityError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for GroqGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError> {
        self.generate_once(prompt).await
    }

    fn name(&self) -> &str {
        "groq"
    }
}

// ============================================================================
// MockGenerator
// ============================================================================

/// Scripted generator for tests: responses are matched by prompt substring,
/// queued failures are returned first, and every call is counted.
#[derive(Default)]
pub struct MockGenerator {
    responses: std::sync::Mutex<Vec<(String, String)>>,
    fallback: std::sync::Mutex<Option<String>>,
    failures: std::sync::Mutex<Vec<CapabilityError>>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `response` whenever the prompt contains `needle`.
    pub fn with_response(self, needle: &str, response: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push((needle.to_string(), response.to_string()));
        self
    }

    /// Respond with `response` when no scripted needle matches.
    pub fn with_fallback(self, response: &str) -> Self {
        *self.fallback.lock().unwrap() = Some(response.to_string());
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

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        {
            let mut failures = self.failures.lock().unwrap();
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }

        let responses = self.responses.lock().unwrap();
        for (needle, response) in responses.iter() {
            if prompt.contains(needle) {
                return Ok(response.clone());
            }
        }
        if let Some(fallback) = self.fallback.lock().unwrap().clone() {
            return Ok(fallback);
        }
        Err(CapabilityError::Api {
            status: 500,
            message: format!("no scripted response for prompt: {:.60}", prompt),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// TESTS
// ============================================================================
