use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use fhir_mapper::FhirError;
use rules_engine::RuleError;
use x12_codec::X12Error;

/// Error detail carried inside the failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error type/code
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    /// Stable diagnostic code, `ENVnnn` for X12 envelope problems
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic_code: Option<String>,
    /// Segment the diagnostic refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    /// Timestamp when the error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Standard API failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

/// Standard API success envelope for operational endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed inquiry: {0}")]
    MalformedEnvelope(#[from] X12Error),

    #[error("Invalid FHIR resource: {0}")]
    Fhir(#[from] FhirError),

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Rule reload failed: {0}")]
    RuleReload(#[from] RuleError),

    #[error("Resource not found")]
    NotFound,

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedEnvelope(_) => StatusCode::BAD_REQUEST,
            ApiError::Fhir(_) => StatusCode::BAD_REQUEST,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::RuleReload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::MalformedEnvelope(_) => "malformed_envelope",
            ApiError::Fhir(_) => "invalid_resource",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::RuleReload(_) => "rule_reload_failed",
            ApiError::NotFound => "not_found",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    /// Stable diagnostic code where the underlying error defines one
    pub fn diagnostic_code(&self) -> Option<&'static str> {
        match self {
            ApiError::MalformedEnvelope(err) => Some(err.diagnostic_code()),
            _ => None,
        }
    }

    fn segment(&self) -> Option<&'static str> {
        match self {
            ApiError::MalformedEnvelope(err) => match err {
                X12Error::MalformedEnvelope { segment, .. } => Some(segment),
                X12Error::MissingSegment(segment) => Some(segment),
                X12Error::MissingElement { segment, .. } => Some(segment),
                _ => None,
            },
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        error!(
            error_id = %error_id,
            error_type = %self.error_type(),
            status_code = %status_code.as_u16(),
            error = %self,
            "API error occurred"
        );

        let body = ApiErrorResponse {
            success: false,
            error: ApiErrorBody {
                error_id,
                error_type: self.error_type().to_string(),
                message: self.to_string(),
                diagnostic_code: self.diagnostic_code().map(str::to_string),
                segment: self.segment().map(str::to_string),
                timestamp: chrono::Utc::now(),
            },
        };

        (status_code, Json(body)).into_response()
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: None,
    }
}

/// Fallback handler for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
