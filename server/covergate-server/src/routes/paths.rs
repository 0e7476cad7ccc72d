//! Route path constants
//!
//! Kept in one place so handlers, route builders and OpenAPI annotations
//! never drift apart.

/// Eligibility check endpoints
pub mod eligibility {
    /// Raw or JSON-wrapped X12 270 inquiry
    pub const X12: &str = "/eligibility/x12";
    /// FHIR CoverageEligibilityRequest inquiry
    pub const FHIR: &str = "/eligibility/fhir";
    /// FHIR-native operation alias of [`FHIR`]
    pub const FHIR_SUBMIT: &str = "/CoverageEligibilityRequest/$submit";
    /// Unified envelope carrying either format
    pub const UNIFIED: &str = "/eligibility";
}

/// Rule administration endpoints
pub mod rules {
    pub const RELOAD: &str = "/rules/reload";
}

/// Health and platform endpoints
pub mod health {
    pub const HEALTH: &str = "/health";
    pub const LIVENESS: &str = "/healthz";
    pub const READINESS: &str = "/readyz";
    pub const SUBSCRIBE: &str = "/subscribe";
}

/// Machine-readable API description
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
