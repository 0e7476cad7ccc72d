use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use audit_events::{EligibilityEventPublisher, MemoryEventSink};
use covergate_server::{create_app, CovergateServer, ServerConfig};
use eligibility_cache::{CachePolicy, MemoryCache};
use rules_engine::{load_rules_from_path, RuleStore};

const RULES_CSV: &str = "\
rule_id,plan_code,service_type_code,coverage,priority,name,copay,prior_auth_required,active
R100,PPO_GOLD,98,covered,10,PPO Gold,150.00,true,true
R110,PPO_GOLD,30,covered,10,PPO Gold,25.00,false,true
";

struct TestConfig {
    app: Router,
    rules_path: PathBuf,
}

impl TestConfig {
    fn new(label: &str) -> Self {
        let rules_path = std::env::temp_dir().join(format!(
            "covergate-ops-{}-{}.csv",
            label,
            std::process::id()
        ));
        std::fs::write(&rules_path, RULES_CSV).expect("write rules fixture");

        let (rules, _) = load_rules_from_path(&rules_path).expect("load rules fixture");
        let store = Arc::new(RuleStore::new(rules));
        Self {
            app: build_app(store, &rules_path),
            rules_path,
        }
    }

    /// Gateway whose rule index is empty, for readiness-gate checks.
    fn without_rules(label: &str) -> Self {
        let rules_path = std::env::temp_dir().join(format!(
            "covergate-ops-{}-{}.csv",
            label,
            std::process::id()
        ));
        let store = Arc::new(RuleStore::new(Vec::new()));
        Self {
            app: build_app(store, &rules_path),
            rules_path,
        }
    }
}

impl Drop for TestConfig {
    fn drop(&mut self) {
        std::fs::remove_file(&self.rules_path).ok();
    }
}

fn build_app(store: Arc<RuleStore>, rules_path: &std::path::Path) -> Router {
    let cache = Arc::new(MemoryCache::new(CachePolicy::default()));
    let sink = Arc::new(MemoryEventSink::new());
    let events = Arc::new(EligibilityEventPublisher::new(sink));

    let mut config = ServerConfig::default();
    config.rules_path = rules_path.display().to_string();
    create_app(CovergateServer::new(Arc::new(config), store, cache, events))
}

async fn send(app: &Router, method: &str, uri: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    app.clone().oneshot(request).await.expect("request routed")
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("collect body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn test_health_reports_every_component() {
    let config = TestConfig::new("health");

    let response = send(&config.app, "GET", "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["data"]["components"]["rules"]["status"], "healthy");
    assert_eq!(
        body["data"]["components"]["rules"]["detail"]["rule_count"],
        2
    );
    assert_eq!(
        body["data"]["components"]["cache"]["detail"]["backend"],
        "memory"
    );
    assert_eq!(
        body["data"]["components"]["events"]["detail"]["topic"],
        "eligibility.checked"
    );
}

#[tokio::test]
async fn test_liveness_is_always_ok() {
    let config = TestConfig::new("live");
    let response = send(&config.app, "GET", "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_gates_on_the_rule_index() {
    let config = TestConfig::new("ready");
    let response = send(&config.app, "GET", "/readyz").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ready"], true);
    assert!(body.get("failing").is_none());

    let empty = TestConfig::without_rules("ready-empty");
    let response = send(&empty.app, "GET", "/readyz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["ready"], false);
    assert_eq!(body["failing"][0], "rules");
}

#[tokio::test]
async fn test_subscribe_declares_the_checked_topic() {
    let config = TestConfig::new("subscribe");

    let response = send(&config.app, "GET", "/subscribe").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let declarations = body.as_array().expect("declaration list");
    assert_eq!(declarations.len(), 1);
    assert_eq!(declarations[0]["pubsubName"], "covergate-pubsub");
    assert_eq!(declarations[0]["topic"], "eligibility.checked");
    assert_eq!(declarations[0]["route"], "/events/eligibility-checked");
}

#[tokio::test]
async fn test_reload_swaps_the_rule_index() {
    let config = TestConfig::new("reload");

    let extended = format!("{RULES_CSV}R120,DENTAL_BASIC,35,covered,10,Dental Basic,10.00,false,true\n");
    std::fs::write(&config.rules_path, extended).expect("rewrite rules fixture");

    let response = send(&config.app, "POST", "/rules/reload").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["loaded"], 3);
    assert_eq!(body["data"]["skipped"], 0);

    let response = send(&config.app, "GET", "/health").await;
    let body = json_body(response).await;
    assert_eq!(
        body["data"]["components"]["rules"]["detail"]["rule_count"],
        3
    );
    assert_eq!(body["data"]["components"]["rules"]["detail"]["version"], 2);
}

#[tokio::test]
async fn test_failed_reload_leaves_the_snapshot_serving() {
    let config = TestConfig::new("reload-bad");

    std::fs::write(&config.rules_path, "foo,bar\n1,2\n").expect("rewrite rules fixture");

    let response = send(&config.app, "POST", "/rules/reload").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["error_type"], "rule_reload_failed");

    let response = send(&config.app, "GET", "/health").await;
    let body = json_body(response).await;
    assert_eq!(
        body["data"]["components"]["rules"]["detail"]["rule_count"],
        2
    );
    assert_eq!(body["data"]["components"]["rules"]["detail"]["version"], 1);
}

#[tokio::test]
async fn test_unknown_routes_answer_the_error_shape() {
    let config = TestConfig::new("fallback");

    let response = send(&config.app, "GET", "/no-such-route").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["error_type"], "not_found");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let config = TestConfig::new("openapi");

    let response = send(&config.app, "GET", "/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "Covergate API");
    assert!(body["paths"]["/eligibility/x12"].is_object());
    assert!(body["paths"]["/rules/reload"].is_object());
}
