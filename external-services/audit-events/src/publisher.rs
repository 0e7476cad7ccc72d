use std::sync::Arc;

use tracing::{debug, error};

use crate::error::EventResult;
use crate::event::{AuditEvent, EligibilityChecked, ELIGIBILITY_CHECKED_EVENT};
use crate::sink::EventSink;

/// Publishes eligibility audit events through the configured sink.
///
/// The gateway spawns [`EligibilityEventPublisher::publish_checked`] and
/// moves on; failures are logged with the event id and never reach the
/// request path.
pub struct EligibilityEventPublisher {
    sink: Arc<dyn EventSink>,
}

impl EligibilityEventPublisher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Wrap a check payload in the event envelope and publish it
    pub async fn publish_checked(&self, payload: EligibilityChecked) {
        let correlation_id = payload.correlation_id.clone();
        let event = match serde_json::to_value(&payload) {
            Ok(data) => AuditEvent::new(ELIGIBILITY_CHECKED_EVENT, data),
            Err(err) => {
                error!(
                    error = %err,
                    correlation_id = %correlation_id,
                    "audit event serialization failed"
                );
                return;
            }
        };
        match self.sink.publish(&event).await {
            Ok(()) => debug!(
                event_id = %event.id,
                correlation_id = %correlation_id,
                "audit event published"
            ),
            Err(err) => error!(
                event_id = %event.id,
                error = %err,
                correlation_id = %correlation_id,
                "audit event publish failed"
            ),
        }
    }

    pub async fn ping(&self) -> EventResult<()> {
        self.sink.ping().await
    }
}
