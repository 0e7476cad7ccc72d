//! Health, readiness and pub/sub declaration handlers
//!
//! - GET /health - per-component health detail
//! - GET /healthz - liveness, always 200
//! - GET /readyz - readiness gate for the cache, event sink and rule index
//! - GET /subscribe - pub/sub subscription declaration

use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use audit_events::ELIGIBILITY_CHECKED_SUBJECT;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::server::CovergateServer;

const HEALTHY: &str = "healthy";

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status, `healthy` or `degraded`
    #[schema(example = "healthy")]
    pub status: String,
    /// Current timestamp in RFC3339 format
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub timestamp: String,
    /// API version
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Process uptime in seconds
    #[schema(example = 3600)]
    pub uptime_seconds: u64,
    /// Individual component health checks
    pub components: HashMap<String, ComponentHealth>,
}

/// One component's health
#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentHealth {
    /// `healthy` or `unhealthy: <reason>`
    #[schema(example = "healthy")]
    pub status: String,
    /// Component-specific detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// Readiness response
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    pub ready: bool,
    /// Components that failed the readiness gate
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failing: Vec<String>,
}

/// Pub/sub subscription declaration entry
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDeclaration {
    #[schema(example = "covergate-pubsub")]
    pub pubsub_name: String,
    #[schema(example = "eligibility.checked")]
    pub topic: String,
    #[schema(example = "/events/eligibility-checked")]
    pub route: String,
}

fn uptime_seconds(server: &CovergateServer) -> u64 {
    let elapsed = Utc::now()
        .signed_duration_since(server.started_at)
        .num_seconds();
    u64::try_from(elapsed).unwrap_or(0)
}

/// Component health detail
#[utoipa::path(
    get,
    path = crate::routes::paths::health::HEALTH,
    tag = "health",
    responses(
        (status = 200, description = "Per-component health detail", body = HealthResponse)
    )
)]
pub async fn health_check(
    State(server): State<CovergateServer>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let mut components = HashMap::new();

    let index = server.rules.snapshot();
    components.insert(
        "rules".to_string(),
        ComponentHealth {
            status: if index.rule_count > 0 {
                HEALTHY.to_string()
            } else {
                "unhealthy: empty rule index".to_string()
            },
            detail: Some(serde_json::json!({
                "rule_count": index.rule_count,
                "loaded_at": index.loaded_at.to_rfc3339(),
                "version": index.source_version,
            })),
        },
    );

    components.insert(
        "cache".to_string(),
        ComponentHealth {
            status: match server.cache.ping().await {
                Ok(()) => HEALTHY.to_string(),
                Err(err) => format!("unhealthy: {err}"),
            },
            detail: Some(serde_json::json!({
                "backend": server.config.cache_backend,
            })),
        },
    );

    components.insert(
        "events".to_string(),
        ComponentHealth {
            status: match server.events.ping().await {
                Ok(()) => HEALTHY.to_string(),
                Err(err) => format!("unhealthy: {err}"),
            },
            detail: Some(serde_json::json!({
                "backend": server.config.events_backend,
                "topic": ELIGIBILITY_CHECKED_SUBJECT,
            })),
        },
    );

    let status = if components.values().all(|c| c.status == HEALTHY) {
        HEALTHY.to_string()
    } else {
        "degraded".to_string()
    };

    let response = HealthResponse {
        status,
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime_seconds(&server),
        components,
    };

    Ok(Json(api_success(response)))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = crate::routes::paths::health::LIVENESS,
    tag = "health",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe
///
/// Ready once the cache and event sink answer pings and the rule index is
/// non-empty; 503 otherwise so the orchestrator holds traffic.
#[utoipa::path(
    get,
    path = crate::routes::paths::health::READINESS,
    tag = "health",
    responses(
        (status = 200, description = "Ready to serve", body = ReadyResponse),
        (status = 503, description = "Not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(server): State<CovergateServer>) -> Response {
    let mut failing = Vec::new();

    if server.rules.snapshot().rule_count == 0 {
        failing.push("rules".to_string());
    }
    if server.cache.ping().await.is_err() {
        failing.push("cache".to_string());
    }
    if server.events.ping().await.is_err() {
        failing.push("events".to_string());
    }

    let ready = failing.is_empty();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadyResponse { ready, failing })).into_response()
}

/// Topics this gateway publishes, in subscription-declaration form
#[utoipa::path(
    get,
    path = crate::routes::paths::health::SUBSCRIBE,
    tag = "health",
    responses(
        (status = 200, description = "Subscription declarations", body = [SubscriptionDeclaration])
    )
)]
pub async fn subscriptions(
    State(server): State<CovergateServer>,
) -> Json<Vec<SubscriptionDeclaration>> {
    Json(vec![SubscriptionDeclaration {
        pubsub_name: server.config.pubsub_name.clone(),
        topic: ELIGIBILITY_CHECKED_SUBJECT.to_string(),
        route: "/events/eligibility-checked".to_string(),
    }])
}
