//! Covergate HTTP gateway
//!
//! This library wires the eligibility pipeline into an HTTP surface:
//! X12 270/271 and FHIR CoverageEligibilityRequest inquiries resolved
//! against a prioritized rule set, with a fingerprint-keyed determination
//! cache and an audit event per check.

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;

// Re-export commonly used types
pub use error::*;
pub use server::{CovergateServer, ServerConfig};

use axum::http::{header, HeaderName, Method};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: CovergateServer) -> Router {
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer()),
        )
        .with_state(server)
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-correlation-id"),
        ])
        .expose_headers([
            HeaderName::from_static("x-correlation-id"),
            HeaderName::from_static("x-cache-hit"),
            HeaderName::from_static("x-elapsed-ms"),
        ])
}
