use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use audit_events::{
    build_event_sink, EligibilityEventPublisher, EventConfig, ELIGIBILITY_CHECKED_SUBJECT,
};
use covergate_server::{create_app, CovergateServer, ServerConfig};
use eligibility_cache::{build_cache, CacheConfig};
use rules_engine::{load_rules_from_path, RuleStore};

/// Covergate HTTP gateway
#[derive(Parser, Debug)]
#[command(name = "covergate-server")]
#[command(about = "Coverage eligibility gateway for X12 270/271 and FHIR inquiries")]
struct Args {
    /// Server bind address
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Rule extract path
    #[arg(long)]
    rules: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(args.verbose);

    let mut config = ServerConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(rules) = args.rules {
        config.rules_path = rules;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        "starting covergate server"
    );

    let (rules, report) = load_rules_from_path(&config.rules_path)
        .with_context(|| format!("loading rules from {}", config.rules_path))?;
    if !report.skipped.is_empty() {
        warn!(
            skipped = report.skipped.len(),
            "rule rows skipped at startup"
        );
    }
    let store = Arc::new(RuleStore::new(rules));

    let cache = build_cache(
        &config.cache_backend,
        &CacheConfig {
            redis_url: config.redis_url.clone(),
            policy: config.cache_policy.clone(),
        },
    )
    .await
    .with_context(|| format!("initializing '{}' cache backend", config.cache_backend))?;
    info!(backend = %config.cache_backend, "determination cache ready");

    let sink = build_event_sink(
        &config.events_backend,
        &EventConfig {
            nats_url: config.nats_url.clone(),
            subject: ELIGIBILITY_CHECKED_SUBJECT.to_string(),
        },
    )
    .await
    .with_context(|| format!("initializing '{}' event sink", config.events_backend))?;
    let events = Arc::new(EligibilityEventPublisher::new(sink));
    info!(backend = %config.events_backend, "audit event sink ready");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;

    let server = CovergateServer::new(Arc::new(config), store, cache, events);
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!(addr = %addr, "covergate server listening");

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "covergate_server={level},rules_engine={level},eligibility_cache={level},audit_events={level},tower_http=info,hyper=info"
        )
        .into()
    });

    let is_development =
        std::env::var("COVERGATE_ENV").unwrap_or_else(|_| "development".to_string())
            == "development";

    if is_development {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .init();
    } else {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .init();
    }
}
