//! Shared runtime state for fw-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Background tasks hold
//! the same `Arc` and write pass / generation results into `status`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use fw_reconcile::{ChangeEvent, FeedType};
use fw_runtime::{ChangeSink, DeliveryStore, PassReport};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::notify::AlertNotifier;

// ---------------------------------------------------------------------------
// BusMsg - SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    /// One persisted status transition.
    StatusUpdate(ChangeEvent),
    /// Summary of a finished pass.
    Pass(PassSummary),
    LogLine { level: String, msg: String },
}

impl BusMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::StatusUpdate(_) => "status_update",
            BusMsg::Pass(_) => "pass",
            BusMsg::LogLine { .. } => "log",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub at: DateTime<Utc>,
    pub due: usize,
    pub probed: usize,
    pub transitions: usize,
    pub persist_failures: usize,
    pub superseded: usize,
    pub received: usize,
    pub delayed: usize,
    pub missing: usize,
}

impl PassSummary {
    pub fn from_report(at: DateTime<Utc>, r: &PassReport) -> Self {
        Self {
            at,
            due: r.due,
            probed: r.probed,
            transitions: r.transitions,
            persist_failures: r.persist_failures,
            superseded: r.superseded,
            received: r.received,
            delayed: r.delayed,
            missing: r.missing,
        }
    }
}

/// Publishes every transition onto the bus as `status_update`.
#[derive(Clone)]
pub struct BusSink {
    bus: broadcast::Sender<BusMsg>,
}

impl BusSink {
    pub fn new(bus: broadcast::Sender<BusMsg>) -> Self {
        Self { bus }
    }
}

impl ChangeSink for BusSink {
    fn publish(&self, event: &ChangeEvent) {
        // No subscribers is fine; events are not buffered for late joiners.
        let _ = self.bus.send(BusMsg::StatusUpdate(event.clone()));
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time snapshot of the monitor, returned by GET /v1/status.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub daemon_uptime_secs: u64,
    pub passes_completed: u64,
    pub last_pass: Option<PassSummary>,
    /// Set when the most recent pass aborted; cleared by the next good pass.
    pub last_pass_error: Option<String>,
    pub last_generated_day: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub config_hash: String,
    pub store: Arc<dyn DeliveryStore>,
    /// Configured feed types, in config order.
    pub feeds: Vec<FeedType>,
    /// `None` when no alert webhook is configured.
    pub notifier: Option<Arc<dyn AlertNotifier>>,
    pub status: Arc<RwLock<StatusSnapshot>>,
}

impl AppState {
    pub fn new(store: Arc<dyn DeliveryStore>, feeds: Vec<FeedType>, config_hash: impl Into<String>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        Self {
            bus,
            build: BuildInfo {
                service: "fw-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config_hash: config_hash.into(),
            store,
            feeds,
            notifier: None,
            status: Arc::new(RwLock::new(StatusSnapshot::default())),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AlertNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn sink(&self) -> BusSink {
        BusSink::new(self.bus.clone())
    }

    pub fn is_configured_feed(&self, feed: &FeedType) -> bool {
        self.feeds.contains(feed)
    }

    pub fn log(&self, level: &str, msg: impl Into<String>) {
        let _ = self.bus.send(BusMsg::LogLine {
            level: level.to_string(),
            msg: msg.into(),
        });
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
