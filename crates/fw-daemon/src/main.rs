//! fw-daemon entry point.
//!
//! Load config, connect and migrate, seed today's schedule,
//! start the background tasks, then serve HTTP. Handlers live in
//! `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use chrono::Utc;
use fw_config::{
    load_layered_yaml, paths_from_env, report_unused_keys, resolve_secrets, SecretRequirement, UnusedKeyPolicy,
};
use fw_daemon::{notify::WebhookNotifier, routes, state, tasks};
use fw_probe::{RemoteProber, SftpConnector};
use fw_runtime::{PassSettings, PgDeliveryStore};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    let cfg = loaded.monitor()?;
    info!(config_hash = %loaded.config_hash, paths = ?paths, "config loaded");

    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !unused.is_clean() {
        warn!(unused = ?unused.unused_leaf_pointers, "config contains keys nothing reads");
    }

    let secrets = resolve_secrets(&cfg, SecretRequirement::RemoteRequired)?;
    if cfg.base_path().is_none() {
        warn!("remote.base_path is not configured; every pass will be skipped until it is");
    }

    let pool = fw_db::connect_from_env().await?;
    fw_db::migrate(&pool).await?;
    let store = Arc::new(PgDeliveryStore::new(pool));

    let mut app_state = state::AppState::new(store, cfg.feed_types(), loaded.config_hash.clone());
    match secrets.alert_webhook.clone() {
        Some(url) => app_state = app_state.with_notifier(Arc::new(WebhookNotifier::new(url))),
        None => warn!("no alert webhook configured; POST /v1/notify will fail"),
    }
    let shared = Arc::new(app_state);

    let feeds = cfg.feed_schedules()?;
    let report = tasks::generate_and_record(&shared, &feeds, Utc::now().date_naive()).await;
    info!(inserted = report.inserted, existing = report.existing, "today's schedule seeded");

    let connector = SftpConnector::new(
        cfg.remote_host()?,
        cfg.remote.port,
        secrets.remote_username.clone().unwrap_or_default(),
        secrets.remote_password.clone().unwrap_or_default(),
        cfg.connect_timeout(),
    );
    let probe = Arc::new(RemoteProber::new(connector));
    let settings = PassSettings {
        base_path: cfg.base_path(),
        policy: cfg.delay_policy(),
    };

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    tasks::spawn_pass_loop(Arc::clone(&shared), probe, settings, cfg.pass_interval());
    tasks::spawn_daily_regeneration(Arc::clone(&shared), feeds, cfg.regenerate_schedule()?);

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_from(&cfg.daemon.allowed_origins));

    let addr = match bind_addr_from_env() {
        Some(a) => a,
        None => cfg.daemon_addr()?,
    };
    info!("fw-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("FW_DAEMON_ADDR").ok()?.parse().ok()
}

fn cors_from(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
