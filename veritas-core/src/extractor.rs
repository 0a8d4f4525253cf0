//! Claim extraction.
//!
//! Turns raw text into an ordered list of atomic claims with character
//! spans, via the text-generation capability. Responses are parsed
//! tolerantly (first JSON object, per-claim skip on malformed entries),
//! spans are snapped to sentence boundaries, and results are cached under a
//! content hash of the input.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{self, VerificationCache};
use crate::config::RetryConfig;
use crate::error::VerifyError;
use crate::generation::{first_json_object, TextGenerator};
use crate::models::AtomicClaim;
use crate::retry::execute_with_retry;

/// How far a span may grow per side while snapping before the snap is
/// abandoned and the original span kept.
const SNAP_LIMIT: usize = 500;

// ============================================================================
// ClaimExtractor
// ============================================================================

pub struct ClaimExtractor {
    generator: Arc<dyn TextGenerator>,
    cache: Option<Arc<dyn VerificationCache>>,
    cache_ttl: Duration,
    retry: RetryConfig,
}

impl ClaimExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryConfig) -> Self {
        Self {
            generator,
            cache: None,
            cache_ttl: Duration::from_secs(86_400),
            retry,
        }
    }

    /// Attach a cache. Reads and writes are fail-open.
    pub fn with_cache(mut self, cache: Arc<dyn VerificationCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// Extract atomic claims from `text`. Rate limits are retried; an
    /// unparsable response is an extraction failure.
    pub async fn extract(&self, text: &str) -> Result<Vec<AtomicClaim>, VerifyError> {
        let key = cache::content_key("claims", text);

        if let Some(cache) = &self.cache {
            match cache.get(&key).await {
                Ok(Some(cached)) => match serde_json::from_str::<Vec<AtomicClaim>>(&cached) {
                    Ok(claims) => {
                        tracing::debug!(count = claims.len(), "Extraction cache hit");
                        return Ok(claims);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarding undecodable extraction cache entry")
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(cache = cache.name(), error = %e, "Cache read failed, extracting without it")
                }
            }
        }

        let prompt = build_extraction_prompt(text);
        let response = execute_with_retry(&self.retry, || self.generator.generate(&prompt)).await?;
        let claims = parse_claims(&response, text)?;

        if let Some(cache) = &self.cache {
            match serde_json::to_string(&claims) {
                Ok(serialized) => {
                    if let Err(e) = cache.set(&key, &serialized, self.cache_ttl).await {
                        tracing::warn!(cache = cache.name(), error = %e, "Cache write failed");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to serialize claims for caching"),
            }
        }

        tracing::info!(count = claims.len(), "Extracted claims");
        Ok(claims)
    }
}

fn build_extraction_prompt(text: &str) -> String {
    format!(
        r#"You are a precise fact-checking assistant. Your task is to decompose the following text into atomic, verifiable claims.

INSTRUCTIONS:
1. Extract ONLY factual assertions (not opinions, questions, or commands)
2. Each claim must be isolated and independently verifiable
3. Preserve the exact wording from the original text
4. Identify the claim type: factual, numerical, temporal, causal, or comparative
5. Provide character-level start and end indices for each claim in the original text

INPUT TEXT:
"""
{text}
"""

OUTPUT FORMAT (JSON):
{{
  "claims": [
    {{
      "text": "exact claim text from input",
      "type": "claim type",
      "startIndex": 0,
      "endIndex": 20
    }}
  ]
}}

Extract all atomic claims now:"#
    )
}

// ============================================================================
// Response parsing
// ============================================================================

fn parse_claims(response: &str, text: &str) -> Result<Vec<AtomicClaim>, VerifyError> {
    let json = first_json_object(response)
        .ok_or_else(|| VerifyError::Extraction("response contained no JSON object".to_string()))?;
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| VerifyError::Extraction(format!("invalid JSON in response: {}", e)))?;
    let raw_claims = parsed
        .get("claims")
        .and_then(|c| c.as_array())
        .ok_or_else(|| VerifyError::Extraction("response lacked a claims array".to_string()))?;

    let chars: Vec<char> = text.chars().collect();
    let mut claims = Vec::with_capacity(raw_claims.len());
    for (index, raw) in raw_claims.iter().enumerate() {
        let mut claim: AtomicClaim = match serde_json::from_value(raw.clone()) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed claim entry");
                continue;
            }
        };
        let (start, end) = snap_chars(&chars, claim.start_index, claim.end_index);
        claim.start_index = start;
        claim.end_index = end;
        claims.push(claim);
    }
    Ok(claims)
}

// ============================================================================
// Sentence snapping
// ============================================================================

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn snap_backward(chars: &[char], start: usize) -> Option<usize> {
    let floor = start.saturating_sub(SNAP_LIMIT);
    let mut boundary = None;
    for pos in (floor..start).rev() {
        if is_terminal(chars[pos]) {
            boundary = Some(pos + 1);
            break;
        }
    }
    let mut snapped = match boundary {
        Some(b) => b,
        None if floor == 0 => 0,
        None => return None,
    };
    while snapped < chars.len() && chars[snapped].is_whitespace() {
        snapped += 1;
    }
    Some(snapped)
}

fn snap_forward(chars: &[char], end: usize) -> Option<usize> {
    if end > 0 && is_terminal(chars[end - 1]) {
        return Some(end);
    }
    let cap = chars.len().min(end + SNAP_LIMIT);
    for pos in end..cap {
        if is_terminal(chars[pos]) {
            return Some(pos + 1);
        }
    }
    if cap == chars.len() {
        return Some(chars.len());
    }
    None
}

fn snap_chars(chars: &[char], start: usize, end: usize) -> (usize, usize) {
    let end = end.min(chars.len());
    let start = start.min(end);
    match (snap_backward(chars, start), snap_forward(chars, end)) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => (start, end),
    }
}

/// Snap a character span to the enclosing sentence: backward to the nearest
/// terminal punctuation or string start, forward to the nearest terminal
/// punctuation (inclusive) or string end. A side that would grow by more
/// than [`SNAP_LIMIT`] abandons the snap and the original span is returned.
pub fn snap_to_sentence(text: &str, start: usize, end: usize) -> (usize, usize) {
    let chars: Vec<char> = text.chars().collect();
    snap_chars(&chars, start, end)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::{CacheError, CapabilityError};
    use crate::generation::MockGenerator;
    use crate::models::ClaimType;
    use async_trait::async_trait;

    fn policy() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay_ms: 10,
        }
    }

    fn extractor(mock: MockGenerator) -> ClaimExtractor {
        ClaimExtractor::new(Arc::new(mock), policy())
    }

    const INPUT: &str = "First sentence here. The Eiffel Tower was completed in 1889. Another one follows.";

    fn claims_response() -> String {
        let start = INPUT.find("The Eiffel").unwrap();
        let end = start + "The Eiffel Tower was completed in 1889.".len();
        format!(
            "Here are the claims:\n```json\n{{\"claims\": [{{\"text\": \"The Eiffel Tower was completed in 1889.\", \"type\": \"temporal\", \"startIndex\": {}, \"endIndex\": {}}}]}}\n```",
            start, end
        )
    }

    // ==== TEST 1: claims parse through surrounding prose and fences ====
    #[tokio::test]
    async fn test_extract_parses_json_with_surrounding_prose() {
        let mock = MockGenerator::new().with_fallback(&claims_response());
        let result = extractor(mock).extract(INPUT).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "The Eiffel Tower was completed in 1889.");
        assert_eq!(result[0].claim_type, ClaimType::Temporal);
        let span: String = INPUT
            .chars()
            .skip(result[0].start_index)
            .take(result[0].end_index - result[0].start_index)
            .collect();
        assert_eq!(span, "The Eiffel Tower was completed in 1889.");
    }

    // ==== TEST 2: missing claims array is an extraction failure ====
    #[tokio::test]
    async fn test_extract_fails_without_claims_array() {
        let mock = MockGenerator::new().with_fallback("{\"facts\": []}");
        let result = extractor(mock).extract(INPUT).await;
        assert!(matches!(result, Err(VerifyError::Extraction(_))));
    }

    // ==== TEST 3: no JSON object at all is an extraction failure ====
    #[tokio::test]
    async fn test_extract_fails_on_plain_prose() {
        let mock = MockGenerator::new().with_fallback("I could not find any claims, sorry.");
        let result = extractor(mock).extract(INPUT).await;
        assert!(matches!(result, Err(VerifyError::Extraction(_))));
    }

    // ==== TEST 4: malformed entries are skipped, valid ones kept ====
    #[tokio::test]
    async fn test_extract_skips_malformed_entries() {
        let response = r#"{"claims": [
            {"notext": true},
            {"text": "Paris is the capital of France."},
            {"text": "Water boils at 100 celsius.", "type": "numerical"}
        ]}"#;
        let mock = MockGenerator::new().with_fallback(response);
        let result = extractor(mock)
            .extract("Paris is the capital of France. Water boils at 100 celsius.")
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        // Missing type and indices fall back to defaults before snapping.
        assert_eq!(result[0].claim_type, ClaimType::Factual);
        assert_eq!(result[1].claim_type, ClaimType::Numerical);
    }

    // ==== TEST 5: mid-sentence spans widen to sentence boundaries ====
    #[test]
    fn test_snap_widens_to_sentence() {
        let start = INPUT.find("Tower").unwrap();
        let end = start + "Tower was".len();
        let (s, e) = snap_to_sentence(INPUT, start, end);

        let sentence_start = INPUT.find("The Eiffel").unwrap();
        let sentence_end = sentence_start + "The Eiffel Tower was completed in 1889.".len();
        assert_eq!((s, e), (sentence_start, sentence_end));
    }

    // ==== TEST 6: spans already on boundaries stay put ====
    #[test]
    fn test_snap_noop_on_exact_sentence() {
        let start = INPUT.find("The Eiffel").unwrap();
        let end = start + "The Eiffel Tower was completed in 1889.".len();
        assert_eq!(snap_to_sentence(INPUT, start, end), (start, end));
    }

    // ==== TEST 7: runaway expansion returns the original span ====
    #[test]
    fn test_snap_guard_keeps_original_span() {
        let text = format!("{}.", "a".repeat(1200));
        let (s, e) = snap_to_sentence(&text, 600, 610);
        assert_eq!((s, e), (600, 610), "No boundary within 500 on either side");

        // Backward succeeds (string start is within reach), forward does not.
        let (s, e) = snap_to_sentence(&text, 100, 110);
        assert_eq!((s, e), (100, 110));
    }

    // ==== TEST 8: snapped length never exceeds original + 1000 ====
    #[test]
    fn test_snap_length_bound() {
        let texts = [
            INPUT.to_string(),
            "no terminal punctuation anywhere in this text at all".to_string(),
            format!("{}. {}", "b".repeat(700), "c".repeat(700)),
            "?!.".to_string(),
        ];
        for text in &texts {
            let len = text.chars().count();
            for (start, end) in [(0, 0), (0, len), (len / 2, len / 2 + 1), (len / 3, len / 2)] {
                let start = start.min(len);
                let end = end.min(len);
                let (s, e) = snap_to_sentence(text, start, end);
                assert!(e <= len);
                assert!(
                    e - s <= (end - start) + 1000,
                    "span ({}, {}) grew to ({}, {}) in {:?}",
                    start,
                    end,
                    s,
                    e,
                    text
                );
            }
        }
    }

    // ==== TEST 9: cache hit skips the generation capability ====
    #[tokio::test]
    async fn test_extract_cache_hit_skips_generator() {
        let cache = Arc::new(MemoryCache::new());
        let cached = serde_json::to_string(&vec![AtomicClaim {
            text: "The Eiffel Tower was completed in 1889.".to_string(),
            claim_type: ClaimType::Temporal,
            start_index: 21,
            end_index: 60,
        }])
        .unwrap();
        cache
            .set(
                &cache::content_key("claims", INPUT),
                &cached,
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let mock = MockGenerator::new().with_fallback(&claims_response());
        let generator = Arc::new(mock);
        let extractor = ClaimExtractor::new(generator.clone(), policy())
            .with_cache(cache, Duration::from_secs(60));

        let result = extractor.extract(INPUT).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].start_index, 21);
        assert_eq!(generator.call_count(), 0, "Served entirely from cache");
    }

    // ==== TEST 10: miss populates the cache; second call is served from it ====
    #[tokio::test]
    async fn test_extract_write_through_then_hit() {
        let cache = Arc::new(MemoryCache::new());
        let mock = MockGenerator::new().with_fallback(&claims_response());
        let generator = Arc::new(mock);
        let extractor = ClaimExtractor::new(generator.clone(), policy())
            .with_cache(cache.clone(), Duration::from_secs(60));

        let first = extractor.extract(INPUT).await.unwrap();
        assert_eq!(generator.call_count(), 1);

        let stored = cache
            .get(&cache::content_key("claims", INPUT))
            .await
            .unwrap();
        assert!(stored.is_some(), "Extraction result written through");

        let second = extractor.extract(INPUT).await.unwrap();
        assert_eq!(generator.call_count(), 1, "Second call served from cache");
        assert_eq!(first, second);
    }

    // ==== TEST 11: cache failures never fail extraction ====
    struct BrokenCache;

    #[async_trait]
    impl VerificationCache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_extract_fails_open_on_cache_errors() {
        let mock = MockGenerator::new().with_fallback(&claims_response());
        let extractor = ClaimExtractor::new(Arc::new(mock), policy())
            .with_cache(Arc::new(BrokenCache), Duration::from_secs(60));

        let result = extractor.extract(INPUT).await.unwrap();
        assert_eq!(result.len(), 1);
    }

    // ==== TEST 12: rate limit retried, then success ====
    #[tokio::test(start_paused = true)]
    async fn test_extract_retries_rate_limit() {
        let mock = MockGenerator::new().with_fallback(&claims_response());
        mock.push_failure(CapabilityError::RateLimited { retry_after: None });
        let generator = Arc::new(mock);
        let extractor = ClaimExtractor::new(generator.clone(), policy());

        let result = extractor.extract(INPUT).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(generator.call_count(), 2);
    }

    // ==== TEST 13: non-rate-limit capability errors propagate untouched ====
    #[tokio::test]
    async fn test_extract_propagates_api_errors() {
        let mock = MockGenerator::new().with_fallback(&claims_response());
        mock.push_failure(CapabilityError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        let generator = Arc::new(mock);
        let extractor = ClaimExtractor::new(generator.clone(), policy());

        let result = extractor.extract(INPUT).await;
        assert!(matches!(
            result,
            Err(VerifyError::Capability(CapabilityError::Api { .. }))
        ));
        assert_eq!(generator.call_count(), 1);
    }
}
