//! Axum router and all HTTP handlers for fw-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers so tests can drive the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use fw_reconcile::{DeliveryStatus, FeedType};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, warn};

use crate::{
    api_types::{
        DeliveriesQuery, ErrorResponse, FeedSummary, HealthResponse, NotifyRequest, NotifyResponse,
        SummaryResponse,
    },
    notify::MissingFileAlert,
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/deliveries/:feed_type", get(deliveries))
        .route("/v1/summary", get(summary))
        .route("/v1/notify", post(notify))
        .with_state(state)
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let mut snap = st.status.read().await.clone();
    snap.daemon_uptime_secs = uptime_secs();
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// GET /v1/deliveries/:feed_type
// ---------------------------------------------------------------------------

/// Records of one feed for a UTC day, ascending by timestamp.
pub(crate) async fn deliveries(
    State(st): State<Arc<AppState>>,
    Path(feed_type): Path<String>,
    Query(q): Query<DeliveriesQuery>,
) -> Response {
    let feed = FeedType::from_name(&feed_type);
    if !st.is_configured_feed(&feed) {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("unknown feed type '{feed_type}'"),
        );
    }

    let day = match parse_day(q.day.as_deref()) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match st.store.fetch_day(&feed, day).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!(feed_type = %feed, day = %day, error = %format!("{err:#}"), "deliveries query failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
        }
    }
}

fn parse_day(raw: Option<&str>) -> Result<NaiveDate, Response> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Utc::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid day '{s}'; expected YYYY-MM-DD"),
            )
        }),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/summary
// ---------------------------------------------------------------------------

/// Per-feed status counts for today (UTC).
pub(crate) async fn summary(State(st): State<Arc<AppState>>) -> Response {
    let day = Utc::now().date_naive();
    let mut feeds = Vec::with_capacity(st.feeds.len());

    for feed in &st.feeds {
        let rows = match st.store.fetch_day(feed, day).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(feed_type = %feed, error = %format!("{err:#}"), "summary query failed");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"));
            }
        };

        let mut s = FeedSummary {
            feed_type: feed.to_string(),
            total: rows.len(),
            ..FeedSummary::default()
        };
        for row in &rows {
            match row.status {
                DeliveryStatus::Expected => s.expected += 1,
                DeliveryStatus::Delayed => s.delayed += 1,
                DeliveryStatus::Missing => s.missing += 1,
                DeliveryStatus::Received => s.received += 1,
            }
        }
        feeds.push(s);
    }

    (StatusCode::OK, Json(SummaryResponse { day, feeds })).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/notify
// ---------------------------------------------------------------------------

pub(crate) async fn notify(State(st): State<Arc<AppState>>, Json(req): Json<NotifyRequest>) -> Response {
    if req.feed_type.trim().is_empty() || req.timestamp.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "feed_type and timestamp are required");
    }

    let Some(notifier) = st.notifier.as_ref() else {
        warn!(feed_type = %req.feed_type, timestamp = %req.timestamp, "notify requested but no alert webhook configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "alert webhook is not configured",
        );
    };

    let alert = MissingFileAlert::compose(&req.feed_type, &req.timestamp);
    info!(feed_type = %req.feed_type, timestamp = %req.timestamp, "sending missing-file alert");

    match notifier.send(&alert).await {
        Ok(()) => {
            st.log("INFO", alert.subject.clone());
            (StatusCode::OK, Json(NotifyResponse { success: true })).into_response()
        }
        Err(err) => {
            error!(
                feed_type = %req.feed_type,
                timestamp = %req.timestamp,
                error = %format!("{err:#}"),
                "missing-file alert failed"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(rx: broadcast::Receiver<BusMsg>) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = match &m {
                    // status_update carries the bare change event payload.
                    BusMsg::StatusUpdate(ev) => serde_json::to_string(ev).ok()?,
                    other => serde_json::to_string(other).ok()?,
                };
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
