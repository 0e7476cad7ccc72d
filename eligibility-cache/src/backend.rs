use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{CacheError, CacheResult};
use crate::memory::MemoryCache;
use crate::record::{CachePolicy, CacheRecord};
use crate::redis::RedisCache;

pub const MEMORY_BACKEND: &str = "memory";
pub const REDIS_BACKEND: &str = "redis";

/// Storage backends the determination cache can run on
#[async_trait]
pub trait DeterminationCache: Send + Sync {
    /// Fresh record for a fingerprint, `None` on miss or stale. A hit bumps
    /// the record's access counters.
    async fn get(
        &self,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> CacheResult<Option<CacheRecord>>;

    async fn put(&self, record: CacheRecord) -> CacheResult<()>;

    /// Backend reachability, for readiness probes
    async fn ping(&self) -> CacheResult<()>;
}

/// Backend settings resolved once at startup
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: String,
    pub policy: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            policy: CachePolicy::default(),
        }
    }
}

/// Resolve a cache backend by key. Unknown keys fail startup rather than
/// surfacing at request time.
pub async fn build_cache(
    key: &str,
    config: &CacheConfig,
) -> CacheResult<Arc<dyn DeterminationCache>> {
    match key {
        MEMORY_BACKEND => Ok(Arc::new(MemoryCache::new(config.policy.clone()))),
        REDIS_BACKEND => Ok(Arc::new(
            RedisCache::connect(&config.redis_url, config.policy.clone()).await?,
        )),
        other => Err(CacheError::UnknownBackend(other.to_string())),
    }
}
