use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::rule::EligibilityRule;

/// Immutable, lookup-ready snapshot of one loaded rule set
#[derive(Debug)]
pub struct RuleIndex {
    buckets: HashMap<(String, String), Vec<EligibilityRule>>,
    pub loaded_at: DateTime<Utc>,
    pub rule_count: usize,
    /// Monotonic version, bumped on every swap
    pub source_version: u64,
}

impl RuleIndex {
    pub fn build(rules: Vec<EligibilityRule>, source_version: u64) -> Self {
        let rule_count = rules.len();
        let mut buckets: HashMap<(String, String), Vec<EligibilityRule>> = HashMap::new();
        for rule in rules {
            buckets
                .entry((rule.plan_code.clone(), rule.service_type_code.clone()))
                .or_default()
                .push(rule);
        }
        for bucket in buckets.values_mut() {
            bucket.sort_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| a.rule_id.cmp(&b.rule_id))
            });
        }
        Self {
            buckets,
            loaded_at: Utc::now(),
            rule_count,
            source_version,
        }
    }

    /// Rules for one plan and service type, in precedence order
    pub fn candidates(&self, plan_code: &str, service_type_code: &str) -> &[EligibilityRule] {
        self.buckets
            .get(&(plan_code.to_string(), service_type_code.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Shared handle over the current rule snapshot.
///
/// Readers clone the `Arc` and keep determining against the snapshot they
/// started with; [`RuleStore::swap`] publishes a rebuilt index atomically.
pub struct RuleStore {
    index: RwLock<Arc<RuleIndex>>,
    version: AtomicU64,
}

impl RuleStore {
    pub fn new(rules: Vec<EligibilityRule>) -> Self {
        let index = RuleIndex::build(rules, 1);
        info!(rule_count = index.rule_count, "rule store initialized");
        Self {
            index: RwLock::new(Arc::new(index)),
            version: AtomicU64::new(1),
        }
    }

    pub fn snapshot(&self) -> Arc<RuleIndex> {
        match self.index.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Rebuild the index from `rules` and publish it. Returns the new
    /// snapshot.
    pub fn swap(&self, rules: Vec<EligibilityRule>) -> Arc<RuleIndex> {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let next = Arc::new(RuleIndex::build(rules, version));
        match self.index.write() {
            Ok(mut guard) => *guard = Arc::clone(&next),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&next),
        }
        info!(
            version = next.source_version,
            rule_count = next.rule_count,
            "rule set swapped"
        );
        next
    }
}
