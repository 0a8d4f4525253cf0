//! Evidence retrieval.
//!
//! Maps each claim to a set of supporting or contradicting web sources via
//! the neural-search capability. Retrieval never fails the caller: missing
//! evidence is a valid outcome (the claim classifies as neutral), so every
//! error path degrades to an empty list. Rate-limited search calls are
//! retried with backoff first; only after the schedule exhausts (or on a
//! non-transient error) does the degradation apply. Batch retrieval runs
//! fixed-size groups concurrently with an inter-group delay to stay inside
//! provider rate limits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::cache::{self, VerificationCache};
use crate::config::{PipelineConfig, RetryConfig, SearchConfig};
use crate::models::EvidenceSource;
use crate::retry::execute_with_retry;
use crate::search::{EvidenceSearch, SearchHit, SearchOptions};

const FILLER_WORDS: [&str; 10] = [
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being",
];

// ============================================================================
// EvidenceRetriever
// ============================================================================

pub struct EvidenceRetriever {
    search: Arc<dyn EvidenceSearch>,
    cache: Option<Arc<dyn VerificationCache>>,
    cache_ttl: Duration,
    config: SearchConfig,
    retry: RetryConfig,
    batch_size: usize,
    batch_delay: Duration,
}

impl EvidenceRetriever {
    pub fn new(
        search: Arc<dyn EvidenceSearch>,
        config: SearchConfig,
        retry: RetryConfig,
        pipeline: &PipelineConfig,
    ) -> Self {
        Self {
            search,
            cache: None,
            cache_ttl: Duration::from_secs(86_400),
            config,
            retry,
            batch_size: pipeline.evidence_batch_size.max(1),
            batch_delay: Duration::from_millis(pipeline.evidence_batch_delay_ms),
        }
    }

    /// Attach a cache. Reads and writes are fail-open.
    pub fn with_cache(mut self, cache: Arc<dyn VerificationCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// Retrieve evidence for one claim. Only sources scoring above the
    /// quality floor survive.
    pub async fn retrieve(&self, claim: &str) -> Vec<EvidenceSource> {
        let key = cache::content_key("evidence", claim);

        if let Some(cache) = &self.cache {
            match cache.get(&key).await {
                Ok(Some(cached)) => match serde_json::from_str::<Vec<EvidenceSource>>(&cached) {
                    Ok(evidence) => {
                        tracing::debug!(count = evidence.len(), "Evidence cache hit");
                        return evidence;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarding undecodable evidence cache entry")
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(cache = cache.name(), error = %e, "Cache read failed, searching without it")
                }
            }
        }

        let query = optimize_query(claim);
        let options = SearchOptions {
            num_results: self.config.num_results,
            max_characters: self.config.max_characters,
            highlight_sentences: self.config.highlight_sentences,
            highlights_per_url: self.config.highlights_per_url,
            highlight_query: claim.to_string(),
        };

        let searched =
            execute_with_retry(&self.retry, || self.search.search(&query, &options)).await;
        let hits = match searched {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(
                    provider = self.search.name(),
                    error = %e,
                    "Evidence search failed, continuing with no evidence"
                );
                return Vec::new();
            }
        };

        let evidence: Vec<EvidenceSource> = hits
            .into_iter()
            .map(to_evidence)
            .filter(|e| e.score > self.config.min_score)
            .collect();

        if let Some(cache) = &self.cache {
            match serde_json::to_string(&evidence) {
                Ok(serialized) => {
                    if let Err(e) = cache.set(&key, &serialized, self.cache_ttl).await {
                        tracing::warn!(cache = cache.name(), error = %e, "Cache write failed");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to serialize evidence for caching"),
            }
        }

        tracing::debug!(count = evidence.len(), "Retrieved evidence");
        evidence
    }

    /// Retrieve evidence for many claims, concurrently within fixed-size
    /// groups and paced between groups. A failed claim yields an empty entry
    /// without disturbing the rest of its group.
    pub async fn batch_retrieve(
        &self,
        claims: &[String],
    ) -> HashMap<String, Vec<EvidenceSource>> {
        let mut results = HashMap::with_capacity(claims.len());

        for (group_index, group) in claims.chunks(self.batch_size).enumerate() {
            if group_index > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }

            let fetches = group
                .iter()
                .map(|claim| async move { (claim.clone(), self.retrieve(claim).await) });

            for (claim, evidence) in join_all(fetches).await {
                results.insert(claim, evidence);
            }
        }

        results
    }
}

/// Strip filler words and very short tokens for a tighter search query,
/// falling back to the raw claim when nothing survives.
pub(crate) fn optimize_query(claim: &str) -> String {
    let lowered = claim.to_lowercase();
    let optimized = lowered
        .split_whitespace()
        .filter(|word| !FILLER_WORDS.contains(word) && word.len() > 2)
        .collect::<Vec<_>>()
        .join(" ");

    if optimized.is_empty() {
        claim.to_string()
    } else {
        optimized
    }
}

fn to_evidence(hit: SearchHit) -> EvidenceSource {
    let SearchHit {
        url,
        title,
        text,
        highlights,
        score,
        published_date,
        author,
    } = hit;

    EvidenceSource {
        url,
        title: title.unwrap_or_default(),
        // Highlights are generated against the claim itself, so they beat
        // the raw page excerpt when present.
        snippet: highlights.into_iter().next().or(text).unwrap_or_default(),
        published_date,
        author,
        score,
    }
}

// ============================================================================
// TESTS
// ============================================================================
