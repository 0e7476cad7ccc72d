//! Eligibility check handlers
//!
//! All inquiry formats funnel into one pipeline:
//! - POST /eligibility/x12 - raw X12 270 or JSON-wrapped canonical inquiry
//! - POST /eligibility/fhir - FHIR CoverageEligibilityRequest
//! - POST /CoverageEligibilityRequest/$submit - FHIR-native alias
//! - POST /eligibility - unified envelope carrying either format
//!
//! Every check resolves to a canonical [`EligibilityRequest`], consults the
//! determination cache by fingerprint, runs the rule engine on a miss, and
//! publishes exactly one `EligibilityChecked` audit event.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use audit_events::{EligibilityChecked, RequestFormat};
use eligibility_cache::CacheRecord;
use eligibility_core::{
    fingerprint, CoverageStatus, EligibilityRequest, EligibilityResponse, DEFAULT_SERVICE_TYPE,
};
use fhir_mapper::{map_request, map_response, operation_outcome, parse_request, FhirError};
use rules_engine::determine;
use x12_codec::{decode_request, encode_response};

use crate::error::ApiError;
use crate::server::CovergateServer;

/// Content type for raw X12 bodies and responses
pub const X12_CONTENT_TYPE: &str = "application/x12";
const EDI_CONTENT_TYPE: &str = "application/edi-x12";

const CORRELATION_HEADER: &str = "x-correlation-id";
const CACHE_HIT_HEADER: &str = "x-cache-hit";
const ELAPSED_HEADER: &str = "x-elapsed-ms";

/// Query parameters accepted by the format-specific endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckParams {
    /// Bypass the cache lookup; the fresh determination is still written back
    #[serde(default)]
    pub skip_cache: bool,
}

/// JSON wrapper accepted on the X12 endpoint for pre-translated inquiries
#[derive(Debug, Deserialize, ToSchema)]
pub struct X12CheckBody {
    /// Canonical inquiry
    #[schema(value_type = Object)]
    pub request: EligibilityRequest,
}

/// Unified inquiry envelope
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityEnvelope {
    /// `x12` or `fhir`
    #[schema(value_type = String, example = "x12")]
    pub format: RequestFormat,
    /// Raw X12 270 interchange, required when `format` is `x12`
    #[serde(default)]
    pub x12_request: Option<String>,
    /// FHIR CoverageEligibilityRequest, required when `format` is `fhir`
    #[serde(default)]
    #[schema(value_type = Object)]
    pub fhir_request: Option<serde_json::Value>,
    /// Caller-supplied correlation id, echoed on the response and audit event
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Bypass the cache lookup
    #[serde(default)]
    pub skip_cache: bool,
}

/// Unified check response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityEnvelopeResponse {
    #[schema(value_type = String, example = "x12")]
    pub format: RequestFormat,
    /// Overall coverage status of the determination
    #[schema(value_type = String, example = "active")]
    pub status: CoverageStatus,
    /// Raw 271 interchange, present for `x12` checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x12_response: Option<String>,
    /// FHIR CoverageEligibilityResponse, present for `fhir` checks
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub fhir_response: Option<serde_json::Value>,
    pub cache_hit: bool,
    pub elapsed_ms: u64,
    pub correlation_id: String,
}

/// One completed check, in canonical form plus pipeline metadata
struct CheckOutcome {
    request: EligibilityRequest,
    response: EligibilityResponse,
    from_cache: bool,
    elapsed_ms: u64,
}

/// Run one eligibility check end to end.
///
/// Publishing the audit event is spawned off the request path; cache
/// failures degrade to a miss or a skipped write and never fail the check.
async fn run_check(
    server: &CovergateServer,
    mut request: EligibilityRequest,
    format: RequestFormat,
    correlation_id: &str,
    skip_cache: bool,
) -> CheckOutcome {
    let started = Instant::now();

    if request.service_type_codes.is_empty() {
        request.service_type_codes = vec![DEFAULT_SERVICE_TYPE.to_string()];
    }

    let key = fingerprint(&request);
    let now = Utc::now();

    let mut cached: Option<EligibilityResponse> = None;
    if !skip_cache {
        match server.cache.get(&key, now).await {
            Ok(Some(record)) => cached = Some(record.response),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "cache read failed, treated as a miss"),
        }
    }
    let from_cache = cached.is_some();

    let response = match cached {
        Some(response) => response,
        None => {
            let index = server.rules.snapshot();
            let determination = determine(&index, &request, &server.config.engine, now.date_naive());
            // An inquiry no rule matched caches on the inactive class even
            // when the engine defaulted it active.
            let matched_any = determination
                .benefits
                .iter()
                .any(|benefit| benefit.status != CoverageStatus::Unknown);
            let response = determination.into_response(request.control_number.clone());
            let ttl_status = if matched_any {
                response.status
            } else {
                CoverageStatus::Unknown
            };
            let ttl = server.config.cache_policy.ttl_for(ttl_status);
            let record = CacheRecord::new(key, response.clone(), ttl, now);
            if let Err(err) = server.cache.put(record).await {
                warn!(error = %err, "cache write failed, determination served uncached");
            }
            response
        }
    };

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    info!(
        format = format.as_str(),
        status = response.status.as_str(),
        cache_hit = from_cache,
        elapsed_ms,
        "eligibility check completed"
    );

    let payload = EligibilityChecked {
        member_id: request.subscriber.member_id.clone(),
        payer_id: request.payer_id.clone(),
        provider_npi: request.provider_npi.clone(),
        request_format: format,
        coverage_status: response.status,
        service_date: request.service_date.map(|date| date.normalized()),
        service_type_codes: request.service_type_codes.clone(),
        from_cache,
        elapsed_ms,
        correlation_id: correlation_id.to_string(),
        checked_at: Utc::now(),
    };
    let publisher = Arc::clone(&server.events);
    tokio::spawn(async move {
        publisher.publish_checked(payload).await;
    });

    CheckOutcome {
        request,
        response,
        from_cache,
        elapsed_ms,
    }
}

fn correlation_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn or_generated(correlation_id: Option<String>) -> String {
    correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn check_headers(correlation_id: &str, outcome: &CheckOutcome) -> [(&'static str, String); 3] {
    [
        (CORRELATION_HEADER, correlation_id.to_string()),
        (CACHE_HIT_HEADER, outcome.from_cache.to_string()),
        (ELAPSED_HEADER, outcome.elapsed_ms.to_string()),
    ]
}

fn is_x12_content_type(content_type: &str) -> bool {
    content_type.starts_with(X12_CONTENT_TYPE)
        || content_type.starts_with(EDI_CONTENT_TYPE)
        || content_type.starts_with("text/plain")
}

fn decode_x12_body(headers: &HeaderMap, body: &Bytes) -> Result<EligibilityRequest, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(X12_CONTENT_TYPE);

    if content_type.starts_with("application/json") {
        let wrapped: X12CheckBody = serde_json::from_slice(body)
            .map_err(|err| ApiError::bad_request(format!("invalid request body: {err}")))?;
        return Ok(wrapped.request);
    }

    if is_x12_content_type(content_type) {
        let text = std::str::from_utf8(body)
            .map_err(|_| ApiError::bad_request("request body is not valid UTF-8"))?;
        return Ok(decode_request(text)?);
    }

    Err(ApiError::bad_request(format!(
        "unsupported content type: {content_type}"
    )))
}

fn accepts_x12(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains(X12_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Check eligibility from an X12 270 inquiry
///
/// Accepts a raw interchange (`application/x12`, `application/edi-x12`,
/// `text/plain`) or a JSON-wrapped canonical inquiry (`application/json`).
/// Answers with a raw 271 when the caller accepts `application/x12`,
/// otherwise with the canonical JSON determination.
#[utoipa::path(
    post,
    path = crate::routes::paths::eligibility::X12,
    tag = "eligibility",
    request_body = String,
    params(
        ("skipCache" = Option<bool>, Query, description = "Bypass the cache lookup")
    ),
    responses(
        (status = 200, description = "Coverage determination"),
        (status = 400, description = "Malformed envelope or request body")
    )
)]
pub async fn check_x12(
    State(server): State<CovergateServer>,
    Query(params): Query<CheckParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = decode_x12_body(&headers, &body)?;
    let correlation_id = or_generated(correlation_id_from(&headers));
    let outcome = run_check(
        &server,
        request,
        RequestFormat::X12,
        &correlation_id,
        params.skip_cache,
    )
    .await;

    if accepts_x12(&headers) {
        let raw = encode_response(&outcome.response, &outcome.request, &server.config.interchange)
            .map_err(|err| ApiError::internal(err.to_string()))?;
        return Ok((
            [
                ("content-type", X12_CONTENT_TYPE.to_string()),
                (CORRELATION_HEADER, correlation_id.clone()),
                (CACHE_HIT_HEADER, outcome.from_cache.to_string()),
                (ELAPSED_HEADER, outcome.elapsed_ms.to_string()),
            ],
            raw,
        )
            .into_response());
    }

    Ok((check_headers(&correlation_id, &outcome), Json(outcome.response)).into_response())
}

/// Check eligibility from a FHIR CoverageEligibilityRequest
///
/// Shape and resource errors come back as a 400 `OperationOutcome`; the
/// response is a FHIR CoverageEligibilityResponse.
#[utoipa::path(
    post,
    path = crate::routes::paths::eligibility::FHIR,
    tag = "eligibility",
    request_body = String,
    params(
        ("skipCache" = Option<bool>, Query, description = "Bypass the cache lookup")
    ),
    responses(
        (status = 200, description = "CoverageEligibilityResponse resource"),
        (status = 400, description = "OperationOutcome describing the rejection")
    )
)]
pub async fn check_fhir(
    State(server): State<CovergateServer>,
    Query(params): Query<CheckParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            return fhir_outcome_response("structure", format!("invalid JSON: {err}"));
        }
    };
    let mapped = match parse_request(value).and_then(map_request) {
        Ok(mapped) => mapped,
        Err(err) => return fhir_error_response(&err),
    };
    if !mapped.translation_misses.is_empty() {
        debug!(
            misses = ?mapped.translation_misses,
            "service categories passed through untranslated"
        );
    }

    let correlation_id = or_generated(correlation_id_from(&headers));
    let outcome = run_check(
        &server,
        mapped.request,
        RequestFormat::Fhir,
        &correlation_id,
        params.skip_cache,
    )
    .await;

    let response_id = Uuid::new_v4().to_string();
    let resource = map_response(&outcome.response, &outcome.request, &response_id);
    (check_headers(&correlation_id, &outcome), Json(resource)).into_response()
}

/// Check eligibility from a unified envelope carrying either format
#[utoipa::path(
    post,
    path = crate::routes::paths::eligibility::UNIFIED,
    tag = "eligibility",
    request_body = EligibilityEnvelope,
    responses(
        (status = 200, description = "Determination in the declared format", body = EligibilityEnvelopeResponse),
        (status = 400, description = "Missing or mismatched payload for the declared format")
    )
)]
pub async fn check_unified(
    State(server): State<CovergateServer>,
    headers: HeaderMap,
    Json(envelope): Json<EligibilityEnvelope>,
) -> Result<Response, ApiError> {
    let correlation_id = or_generated(
        envelope
            .correlation_id
            .clone()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .or_else(|| correlation_id_from(&headers)),
    );

    match envelope.format {
        RequestFormat::X12 => {
            let text = envelope.x12_request.as_deref().ok_or_else(|| {
                ApiError::bad_request("x12Request is required when format is \"x12\"")
            })?;
            let request = decode_request(text)?;
            let outcome = run_check(
                &server,
                request,
                RequestFormat::X12,
                &correlation_id,
                envelope.skip_cache,
            )
            .await;
            let raw =
                encode_response(&outcome.response, &outcome.request, &server.config.interchange)
                    .map_err(|err| ApiError::internal(err.to_string()))?;
            let body = EligibilityEnvelopeResponse {
                format: RequestFormat::X12,
                status: outcome.response.status,
                x12_response: Some(raw),
                fhir_response: None,
                cache_hit: outcome.from_cache,
                elapsed_ms: outcome.elapsed_ms,
                correlation_id: correlation_id.clone(),
            };
            Ok((check_headers(&correlation_id, &outcome), Json(body)).into_response())
        }
        RequestFormat::Fhir => {
            let value = envelope.fhir_request.ok_or_else(|| {
                ApiError::bad_request("fhirRequest is required when format is \"fhir\"")
            })?;
            let mapped = parse_request(value).and_then(map_request)?;
            let outcome = run_check(
                &server,
                mapped.request,
                RequestFormat::Fhir,
                &correlation_id,
                envelope.skip_cache,
            )
            .await;
            let response_id = Uuid::new_v4().to_string();
            let resource = map_response(&outcome.response, &outcome.request, &response_id);
            let body = EligibilityEnvelopeResponse {
                format: RequestFormat::Fhir,
                status: outcome.response.status,
                x12_response: None,
                fhir_response: Some(
                    serde_json::to_value(&resource)
                        .map_err(|err| ApiError::internal(err.to_string()))?,
                ),
                cache_hit: outcome.from_cache,
                elapsed_ms: outcome.elapsed_ms,
                correlation_id: correlation_id.clone(),
            };
            Ok((check_headers(&correlation_id, &outcome), Json(body)).into_response())
        }
    }
}

fn fhir_error_response(err: &FhirError) -> Response {
    let code = match err {
        FhirError::UnsupportedResourceType { .. } => "not-supported",
        FhirError::MissingField(_) => "required",
        FhirError::InvalidResource(_) => "invalid",
    };
    fhir_outcome_response(code, err.to_string())
}

fn fhir_outcome_response(code: &str, diagnostics: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(operation_outcome("error", code, diagnostics)),
    )
        .into_response()
}
