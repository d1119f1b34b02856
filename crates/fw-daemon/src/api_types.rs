//! Request and response types for the fw-daemon HTTP endpoints.
//!
//! No business logic lives here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/deliveries/{feed_type}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveriesQuery {
    /// `YYYY-MM-DD`; defaults to today (UTC).
    pub day: Option<String>,
}

// ---------------------------------------------------------------------------
// /v1/summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSummary {
    pub feed_type: String,
    pub total: usize,
    pub expected: usize,
    pub delayed: usize,
    pub missing: usize,
    pub received: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub day: NaiveDate,
    pub feeds: Vec<FeedSummary>,
}

// ---------------------------------------------------------------------------
// /v1/notify
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub feed_type: String,
    /// Slot timestamp as shown to the operator; echoed verbatim.
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub success: bool,
}
