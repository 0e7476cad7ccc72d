use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::backend::DeterminationCache;
use crate::error::CacheResult;
use crate::record::{CachePolicy, CacheRecord};

/// In-process cache backed by a concurrent map. The default backend for
/// single-instance deployments and tests.
pub struct MemoryCache {
    entries: DashMap<String, CacheRecord>,
    policy: CachePolicy,
}

impl MemoryCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DeterminationCache for MemoryCache {
    async fn get(
        &self,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> CacheResult<Option<CacheRecord>> {
        let Some(mut entry) = self.entries.get_mut(fingerprint) else {
            return Ok(None);
        };
        // stale entries stay put; replacement happens on the next put
        if !entry.is_fresh(now, self.policy.max_cache_age_secs) {
            return Ok(None);
        }
        entry.access_count += 1;
        entry.last_accessed_at = now;
        Ok(Some(entry.clone()))
    }

    async fn put(&self, record: CacheRecord) -> CacheResult<()> {
        self.entries.insert(record.fingerprint.clone(), record);
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use eligibility_core::{CoverageStatus, EligibilityResponse};

    use super::*;

    fn record(fingerprint: &str, status: CoverageStatus, ttl: u64, now: DateTime<Utc>) -> CacheRecord {
        let response = EligibilityResponse {
            control_number: "0001".into(),
            status,
            plan: None,
            benefits: vec![],
        };
        CacheRecord::new(fingerprint, response, ttl, now)
    }

    #[tokio::test]
    async fn hit_bumps_the_access_counters() {
        let cache = MemoryCache::new(CachePolicy::default());
        let now = Utc::now();
        cache
            .put(record("fp-1", CoverageStatus::Active, 86_400, now))
            .await
            .unwrap();

        let later = now + Duration::seconds(60);
        let first = cache.get("fp-1", later).await.unwrap().unwrap();
        assert_eq!(first.access_count, 1);
        assert_eq!(first.last_accessed_at, later);

        let second = cache.get("fp-1", later).await.unwrap().unwrap();
        assert_eq!(second.access_count, 2);
    }

    #[tokio::test]
    async fn absent_fingerprint_is_a_miss() {
        let cache = MemoryCache::new(CachePolicy::default());
        assert!(cache.get("nope", Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_record_reads_as_a_miss_but_is_not_deleted() {
        let cache = MemoryCache::new(CachePolicy::default());
        let now = Utc::now();
        cache
            .put(record("fp-1", CoverageStatus::Inactive, 3_600, now))
            .await
            .unwrap();

        let expired = now + Duration::seconds(3_700);
        assert!(cache.get("fp-1", expired).await.unwrap().is_none());
        assert_eq!(cache.len(), 1);

        // still fresh from a vantage point inside the ttl
        assert!(cache
            .get("fp-1", now + Duration::seconds(60))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn inactive_ttl_expires_before_active_ttl() {
        let policy = CachePolicy::default();
        let cache = MemoryCache::new(policy.clone());
        let now = Utc::now();

        let active_ttl = policy.ttl_for(CoverageStatus::Active);
        let inactive_ttl = policy.ttl_for(CoverageStatus::Inactive);
        cache
            .put(record("fp-active", CoverageStatus::Active, active_ttl, now))
            .await
            .unwrap();
        cache
            .put(record(
                "fp-inactive",
                CoverageStatus::Inactive,
                inactive_ttl,
                now,
            ))
            .await
            .unwrap();

        let two_hours = now + Duration::seconds(7_200);
        assert!(cache.get("fp-active", two_hours).await.unwrap().is_some());
        assert!(cache.get("fp-inactive", two_hours).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_replaces_an_existing_record() {
        let cache = MemoryCache::new(CachePolicy::default());
        let now = Utc::now();
        cache
            .put(record("fp-1", CoverageStatus::Inactive, 3_600, now))
            .await
            .unwrap();
        cache
            .put(record("fp-1", CoverageStatus::Active, 86_400, now))
            .await
            .unwrap();

        let got = cache.get("fp-1", now).await.unwrap().unwrap();
        assert_eq!(got.status, CoverageStatus::Active);
        assert_eq!(got.access_count, 1);
        assert_eq!(cache.len(), 1);
    }
}
