//! Rule administration handlers
//!
//! - POST /rules/reload - re-read the rule extract and swap the index

use axum::{extract::State, response::Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use rules_engine::load_rules_from_path;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::server::CovergateServer;

/// Reload outcome
#[derive(Debug, Serialize, ToSchema)]
pub struct ReloadResponse {
    /// Rules now serving
    #[schema(example = 42)]
    pub loaded: usize,
    /// Malformed rows skipped during the load
    #[schema(example = 0)]
    pub skipped: usize,
}

/// Re-read the rule source and swap the active index
///
/// A failed load leaves the previous snapshot serving; the swap only
/// happens once the whole extract has parsed.
#[utoipa::path(
    post,
    path = crate::routes::paths::rules::RELOAD,
    tag = "rules",
    responses(
        (status = 200, description = "Rule index swapped", body = ReloadResponse),
        (status = 500, description = "Load failed, previous snapshot unchanged")
    )
)]
pub async fn reload_rules(
    State(server): State<CovergateServer>,
) -> Result<Json<ApiResponse<ReloadResponse>>, ApiError> {
    let (rules, report) = load_rules_from_path(&server.config.rules_path)?;
    if !report.skipped.is_empty() {
        warn!(skipped = report.skipped.len(), "rule rows skipped during reload");
    }
    server.rules.swap(rules);

    Ok(Json(api_success(ReloadResponse {
        loaded: report.loaded,
        skipped: report.skipped.len(),
    })))
}
