use axum::response::Json;
use utoipa::OpenApi;

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        // Eligibility endpoints
        crate::handlers::eligibility::check_x12,
        crate::handlers::eligibility::check_fhir,
        crate::handlers::eligibility::check_unified,

        // Rule administration
        crate::handlers::rules::reload_rules,

        // Health endpoints
        crate::handlers::health::health_check,
        crate::handlers::health::liveness,
        crate::handlers::health::readiness,
        crate::handlers::health::subscriptions,
    ),
    components(
        schemas(
            // Eligibility schemas
            crate::handlers::eligibility::X12CheckBody,
            crate::handlers::eligibility::EligibilityEnvelope,
            crate::handlers::eligibility::EligibilityEnvelopeResponse,

            // Rule schemas
            crate::handlers::rules::ReloadResponse,

            // Health schemas
            crate::handlers::health::HealthResponse,
            crate::handlers::health::ComponentHealth,
            crate::handlers::health::ReadyResponse,
            crate::handlers::health::SubscriptionDeclaration,
        )
    ),
    tags(
        (name = "eligibility", description = "Coverage eligibility checks over X12 270/271 and FHIR"),
        (name = "rules", description = "Determination rule administration"),
        (name = "health", description = "Health, readiness and pub/sub declarations"),
    ),
    info(
        title = "Covergate API",
        version = "0.1.0",
        description = "Coverage eligibility gateway: accepts X12 270 and FHIR CoverageEligibilityRequest inquiries, answers from a prioritized rule set with a fingerprint-keyed determination cache.",
        contact(
            name = "Covergate Team",
            email = "team@covergate.dev",
            url = "https://covergate.dev"
        ),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
        (url = "https://api.covergate.dev", description = "Production server"),
    ),
)]
pub struct ApiDoc;

/// Serve the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
