use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eligibility_core::{CoverageStatus, EligibilityResponse};

/// TTL policy for cached determinations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Lifetime of an active-member determination
    pub active_member_ttl_secs: u64,
    /// Lifetime of every other determination
    pub inactive_member_ttl_secs: u64,
    /// Hard cap on the age of anything served from cache
    pub max_cache_age_secs: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            active_member_ttl_secs: 86_400,
            inactive_member_ttl_secs: 3_600,
            max_cache_age_secs: 86_400,
        }
    }
}

impl CachePolicy {
    /// TTL for a determination with the given overall status
    pub fn ttl_for(&self, status: CoverageStatus) -> u64 {
        if status.is_active() {
            self.active_member_ttl_secs
        } else {
            self.inactive_member_ttl_secs
        }
    }
}

/// One cached determination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub fingerprint: String,
    pub response: EligibilityResponse,
    /// Status the TTL was chosen from, kept alongside for introspection
    pub status: CoverageStatus,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub access_count: u64,
    pub last_accessed_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(
        fingerprint: impl Into<String>,
        response: EligibilityResponse,
        ttl_seconds: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let status = response.status;
        Self {
            fingerprint: fingerprint.into(),
            response,
            status,
            created_at: now,
            ttl_seconds,
            access_count: 0,
            last_accessed_at: now,
        }
    }

    /// Whether the record may still be served at `now`. The effective
    /// lifetime is the record's TTL capped by the policy's maximum age.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_cache_age_secs: u64) -> bool {
        let age = now.signed_duration_since(self.created_at).num_seconds();
        if age < 0 {
            return true;
        }
        let lifetime = self.ttl_seconds.min(max_cache_age_secs);
        u64::try_from(age).map(|age| age <= lifetime).unwrap_or(false)
    }
}
