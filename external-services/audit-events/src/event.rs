use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use eligibility_core::CoverageStatus;

/// Subject eligibility events are published on
pub const ELIGIBILITY_CHECKED_SUBJECT: &str = "eligibility.checked";
/// `event_type` discriminator carried in the envelope
pub const ELIGIBILITY_CHECKED_EVENT: &str = "EligibilityChecked";

/// Platform event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: &str, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Inquiry format a check arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestFormat {
    X12,
    Fhir,
}

impl RequestFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X12 => "x12",
            Self::Fhir => "fhir",
        }
    }
}

/// Payload of one completed eligibility check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityChecked {
    pub member_id: String,
    pub payer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_npi: Option<String>,
    pub request_format: RequestFormat,
    pub coverage_status: CoverageStatus,
    /// Normalized service date (`YYYY-MM-DD` or `start/end`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date: Option<String>,
    pub service_type_codes: Vec<String>,
    pub from_cache: bool,
    pub elapsed_ms: u64,
    pub correlation_id: String,
    pub checked_at: DateTime<Utc>,
}
