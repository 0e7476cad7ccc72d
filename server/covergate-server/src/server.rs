use std::sync::Arc;

use chrono::{DateTime, Utc};

use audit_events::EligibilityEventPublisher;
use eligibility_cache::{CachePolicy, DeterminationCache};
use rules_engine::{EngineConfig, RuleStore};
use x12_codec::InterchangeConfig;

/// Main gateway state shared across handlers
#[derive(Clone)]
pub struct CovergateServer {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Active rule index
    pub rules: Arc<RuleStore>,
    /// Determination cache backend
    pub cache: Arc<dyn DeterminationCache>,
    /// Audit event publisher
    pub events: Arc<EligibilityEventPublisher>,
    /// Process start, for uptime reporting
    pub started_at: DateTime<Utc>,
}

impl CovergateServer {
    pub fn new(
        config: Arc<ServerConfig>,
        rules: Arc<RuleStore>,
        cache: Arc<dyn DeterminationCache>,
        events: Arc<EligibilityEventPublisher>,
    ) -> Self {
        Self {
            config,
            rules,
            cache,
            events,
            started_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for CovergateServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CovergateServer")
            .field("config", &self.config)
            .field("started_at", &self.started_at)
            .finish()
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Rule extract path
    pub rules_path: String,
    /// Cache backend key (`memory` or `redis`)
    pub cache_backend: String,
    /// Redis connection string
    pub redis_url: String,
    /// Determination cache TTLs
    pub cache_policy: CachePolicy,
    /// Event sink key (`nats` or `log`)
    pub events_backend: String,
    /// NATS connection string
    pub nats_url: String,
    /// Pub/sub component name advertised on `/subscribe`
    pub pubsub_name: String,
    /// Determination engine settings
    pub engine: EngineConfig,
    /// Interchange identity for outbound 271s
    pub interchange: InterchangeConfig,
}

impl ServerConfig {
    /// Read the configuration from `COVERGATE_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let interchange = InterchangeConfig {
            sender_id: env_string("COVERGATE_X12_SENDER_ID", &defaults.interchange.sender_id),
            receiver_id: env_string(
                "COVERGATE_X12_RECEIVER_ID",
                &defaults.interchange.receiver_id,
            ),
            ..defaults.interchange.clone()
        };

        Self {
            host: env_string("COVERGATE_HOST", &defaults.host),
            port: env_parsed("COVERGATE_PORT", defaults.port),
            rules_path: env_string("COVERGATE_RULES_PATH", &defaults.rules_path),
            cache_backend: env_string("COVERGATE_CACHE_BACKEND", &defaults.cache_backend),
            redis_url: env_string("COVERGATE_REDIS_URL", &defaults.redis_url),
            cache_policy: CachePolicy {
                active_member_ttl_secs: env_parsed(
                    "COVERGATE_ACTIVE_TTL_SECS",
                    defaults.cache_policy.active_member_ttl_secs,
                ),
                inactive_member_ttl_secs: env_parsed(
                    "COVERGATE_INACTIVE_TTL_SECS",
                    defaults.cache_policy.inactive_member_ttl_secs,
                ),
                max_cache_age_secs: env_parsed(
                    "COVERGATE_MAX_CACHE_AGE_SECS",
                    defaults.cache_policy.max_cache_age_secs,
                ),
            },
            events_backend: env_string("COVERGATE_EVENTS_BACKEND", &defaults.events_backend),
            nats_url: env_string("COVERGATE_NATS_URL", &defaults.nats_url),
            pubsub_name: env_string("COVERGATE_PUBSUB_NAME", &defaults.pubsub_name),
            engine: EngineConfig {
                unknown_defaults_to_active: env_parsed(
                    "COVERGATE_UNKNOWN_DEFAULTS_ACTIVE",
                    defaults.engine.unknown_defaults_to_active,
                ),
            },
            interchange,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            rules_path: "config/rules.csv".to_string(),
            cache_backend: eligibility_cache::MEMORY_BACKEND.to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            cache_policy: CachePolicy::default(),
            events_backend: audit_events::LOG_BACKEND.to_string(),
            nats_url: "nats://127.0.0.1:4222".to_string(),
            pubsub_name: "covergate-pubsub".to_string(),
            engine: EngineConfig::default(),
            interchange: InterchangeConfig::default(),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_documented_ones() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rules_path, "config/rules.csv");
        assert_eq!(config.cache_backend, "memory");
        assert_eq!(config.events_backend, "log");
        assert_eq!(config.pubsub_name, "covergate-pubsub");
        assert!(config.engine.unknown_defaults_to_active);
    }
}
