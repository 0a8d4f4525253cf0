//! Content-addressed verification cache.
//!
//! Extraction and retrieval results are cached under a sha256 of their input
//! with a TTL. Usage is cache-aside and fail-open: a missing or broken cache
//! can slow the pipeline down but never fail it. Entries are immutable blobs,
//! so concurrent read/write races at worst duplicate an upstream call.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::CacheError;

#[async_trait]
pub trait VerificationCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Cache key for `content` under a namespace (`claims` / `evidence`).
pub fn content_key(namespace: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{}:{:x}", namespace, hasher.finalize())
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process TTL cache. Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let live = entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone());
        if live.is_none() {
            entries.remove(key);
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Always-miss cache for runs where caching is disabled.
#[derive(Default)]
pub struct NoopCache;

#[async_trait]
impl VerificationCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}
