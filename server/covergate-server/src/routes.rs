pub mod paths;

use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    error,
    handlers::{eligibility, health, rules},
    openapi,
    server::CovergateServer,
};

/// Create eligibility check routes
pub fn eligibility_routes() -> Router<CovergateServer> {
    Router::new()
        .route(paths::eligibility::X12, post(eligibility::check_x12))
        .route(paths::eligibility::FHIR, post(eligibility::check_fhir))
        .route(paths::eligibility::FHIR_SUBMIT, post(eligibility::check_fhir))
        .route(paths::eligibility::UNIFIED, post(eligibility::check_unified))
}

/// Create rule administration routes
pub fn rule_routes() -> Router<CovergateServer> {
    Router::new().route(paths::rules::RELOAD, post(rules::reload_rules))
}

/// Create health and platform routes
pub fn health_routes() -> Router<CovergateServer> {
    Router::new()
        .route(paths::health::HEALTH, get(health::health_check))
        .route(paths::health::LIVENESS, get(health::liveness))
        .route(paths::health::READINESS, get(health::readiness))
        .route(paths::health::SUBSCRIBE, get(health::subscriptions))
}

/// Create all application routes
pub fn create_routes() -> Router<CovergateServer> {
    Router::new()
        .merge(health_routes())
        .merge(eligibility_routes())
        .merge(rule_routes())
        .route(paths::OPENAPI_JSON, get(openapi::openapi_json))
        .fallback(error::not_found)
}
