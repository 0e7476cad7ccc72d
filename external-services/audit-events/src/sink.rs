use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::error::{EventError, EventResult};
use crate::event::{AuditEvent, ELIGIBILITY_CHECKED_SUBJECT};

pub const NATS_BACKEND: &str = "nats";
pub const LOG_BACKEND: &str = "log";

/// Transport an audit event leaves the process through
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &AuditEvent) -> EventResult<()>;

    /// Sink reachability, for readiness probes
    async fn ping(&self) -> EventResult<()>;
}

/// NATS-backed sink publishing on a fixed subject
pub struct NatsEventSink {
    client: async_nats::Client,
    subject: String,
}

impl NatsEventSink {
    pub async fn connect(url: &str, subject: &str) -> EventResult<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|err| EventError::Connect(err.to_string()))?;
        Ok(Self {
            client,
            subject: subject.to_string(),
        })
    }
}

#[async_trait]
impl EventSink for NatsEventSink {
    async fn publish(&self, event: &AuditEvent) -> EventResult<()> {
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("event_id", event.id.to_string().as_str());
        headers.insert("event_type", event.event_type.as_str());
        headers.insert("timestamp", event.timestamp.to_rfc3339().as_str());

        let payload = serde_json::to_vec(event)?;
        self.client
            .publish_with_headers(self.subject.clone(), headers, payload.into())
            .await
            .map_err(|err| EventError::PublishFailure(err.to_string()))?;
        Ok(())
    }

    async fn ping(&self) -> EventResult<()> {
        self.client
            .flush()
            .await
            .map_err(|err| EventError::Connect(err.to_string()))
    }
}

/// Structured-log sink for development runs without a broker
#[derive(Debug, Default)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn publish(&self, event: &AuditEvent) -> EventResult<()> {
        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            payload = %event.data,
            "audit event"
        );
        Ok(())
    }

    async fn ping(&self) -> EventResult<()> {
        Ok(())
    }
}

/// Capturing sink for tests
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn publish(&self, event: &AuditEvent) -> EventResult<()> {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
        Ok(())
    }

    async fn ping(&self) -> EventResult<()> {
        Ok(())
    }
}

/// Sink settings resolved once at startup
#[derive(Debug, Clone)]
pub struct EventConfig {
    pub nats_url: String,
    pub subject: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            nats_url: "nats://127.0.0.1:4222".to_string(),
            subject: ELIGIBILITY_CHECKED_SUBJECT.to_string(),
        }
    }
}

/// Resolve an event sink by key. Unknown keys fail startup rather than
/// surfacing at request time.
pub async fn build_event_sink(key: &str, config: &EventConfig) -> EventResult<Arc<dyn EventSink>> {
    match key {
        LOG_BACKEND => Ok(Arc::new(LogEventSink)),
        NATS_BACKEND => Ok(Arc::new(
            NatsEventSink::connect(&config.nats_url, &config.subject).await?,
        )),
        other => Err(EventError::UnknownBackend(other.to_string())),
    }
}
