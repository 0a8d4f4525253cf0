use config::{Config, ConfigError, File};
use serde::Deserialize;

/// Top-level configuration. Every section has working defaults so the
/// pipeline runs with no config file at all (API keys then come from the
/// environment).
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct VeritasConfig {
    pub generation: GenerationConfig,
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub progressive: ProgressiveConfig,
    pub retry: RetryConfig,
}

/// Text-generation capability (claim extraction + entailment classification).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// Falls back to `GROQ_API_KEY` when unset.
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.1,
            max_tokens: 2048,
            request_timeout_secs: 30,
        }
    }
}

/// Neural-search capability (evidence retrieval).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// Falls back to `EXA_API_KEY` when unset.
    pub api_key: Option<String>,
    pub num_results: usize,
    pub max_characters: usize,
    pub highlight_sentences: usize,
    pub highlights_per_url: usize,
    pub min_score: f32,
    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            num_results: 5,
            max_characters: 1500,
            highlight_sentences: 5,
            highlights_per_url: 3,
            min_score: 0.3,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 86_400,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub evidence_batch_size: usize,
    pub evidence_batch_delay_ms: u64,
    pub classify_delay_ms: u64,
    pub confidence_threshold: u8,
    pub default_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            evidence_batch_size: 3,
            evidence_batch_delay_ms: 500,
            classify_delay_ms: 1_000,
            confidence_threshold: 70,
            default_timeout_ms: 120_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProgressiveConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub channel_capacity: usize,
}

impl Default for ProgressiveConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            batch_delay_ms: 1_000,
            channel_capacity: 32,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 2_000,
        }
    }
}

impl VeritasConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_pipeline_constants() {
        let cfg = VeritasConfig::default();
        assert_eq!(cfg.pipeline.evidence_batch_size, 3);
        assert_eq!(cfg.pipeline.evidence_batch_delay_ms, 500);
        assert_eq!(cfg.pipeline.classify_delay_ms, 1_000);
        assert_eq!(cfg.pipeline.confidence_threshold, 70);
        assert_eq!(cfg.progressive.batch_size, 4);
        assert_eq!(cfg.progressive.batch_delay_ms, 1_000);
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.retry.initial_delay_ms, 2_000);
        assert_eq!(cfg.cache.ttl_secs, 86_400);
        assert!((cfg.search.min_score - 0.3).abs() < f32::EPSILON);
    }
}
