use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::backend::DeterminationCache;
use crate::error::{CacheError, CacheResult};
use crate::record::{CachePolicy, CacheRecord};

const KEY_PREFIX: &str = "covergate:elig:";

/// Redis-backed cache for multi-instance deployments.
///
/// Records are stored as JSON with a physical expiry at the policy's maximum
/// age; logical freshness is still enforced on every read, so a record whose
/// own TTL is shorter reads as a miss before Redis collects it.
pub struct RedisCache {
    manager: ConnectionManager,
    policy: CachePolicy,
}

impl RedisCache {
    pub async fn connect(url: &str, policy: CachePolicy) -> CacheResult<Self> {
        let client =
            redis::Client::open(url).map_err(|err| CacheError::Unavailable(err.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|err| CacheError::Unavailable(err.to_string()))?;
        Ok(Self { manager, policy })
    }

    fn key(fingerprint: &str) -> String {
        format!("{KEY_PREFIX}{fingerprint}")
    }
}

#[async_trait]
impl DeterminationCache for RedisCache {
    async fn get(
        &self,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> CacheResult<Option<CacheRecord>> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn
            .get(Self::key(fingerprint))
            .await
            .map_err(|err| CacheError::Unavailable(err.to_string()))?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let mut record: CacheRecord = serde_json::from_str(&raw)?;
        // stale records are left for the physical expiry to collect
        if !record.is_fresh(now, self.policy.max_cache_age_secs) {
            return Ok(None);
        }
        record.access_count += 1;
        record.last_accessed_at = now;
        match serde_json::to_string(&record) {
            Ok(updated) => {
                // best-effort counter write-back, keeping the existing expiry
                let outcome: Result<(), redis::RedisError> = redis::cmd("SET")
                    .arg(Self::key(fingerprint))
                    .arg(updated)
                    .arg("KEEPTTL")
                    .query_async(&mut conn)
                    .await;
                if let Err(err) = outcome {
                    debug!(error = %err, "cache access write-back failed");
                }
            }
            Err(err) => debug!(error = %err, "cache record re-serialization failed"),
        }
        Ok(Some(record))
    }

    async fn put(&self, record: CacheRecord) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let raw = serde_json::to_string(&record)?;
        let expiry = self.policy.max_cache_age_secs;
        conn.set_ex(Self::key(&record.fingerprint), raw, expiry)
            .await
            .map_err(|err| CacheError::Unavailable(err.to_string()))
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| CacheError::Unavailable(err.to_string()))
    }
}
