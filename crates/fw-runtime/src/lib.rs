//! fw-runtime
//!
//! Drives the arrival model against real collaborators:
//!
//! - [`generate_day`] seeds one record per (feed type, slot) for a day.
//! - [`run_pass`] probes due records, advances their state, persists each
//!   transition and publishes one change event per transition.
//!
//! Both are written against the [`DeliveryStore`] / [`ChangeSink`] seams and
//! the [`fw_probe::ExistenceProbe`] trait so they run unchanged on Postgres
//! and on the in-memory testkit.

mod pass;
mod schedule;
mod store_pg;
#[cfg(feature = "testkit")]
pub mod testkit;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use fw_reconcile::{ChangeEvent, DeliveryStatus, ExpectedDelivery, FeedType, NewDelivery};

pub use fw_db::{TransitionWrite, UpsertOutcome};
pub use pass::{run_pass, PassError, PassReport, PassSettings};
pub use schedule::{generate_day, GenerateReport};
pub use store_pg::PgDeliveryStore;

/// Record store as seen by the generator, the pass and the query endpoint.
#[async_trait::async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Insert a generated slot, or leave an existing row's status alone.
    async fn upsert_expected(&self, slot: &NewDelivery) -> Result<UpsertOutcome>;

    /// Latest `received` slot per feed type.
    async fn last_received(&self) -> Result<Vec<(FeedType, DateTime<Utc>)>>;

    /// Records with `timestamp <= now`, ascending by timestamp.
    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<ExpectedDelivery>>;

    /// Move `id` from `from` to `to`. Writes nothing and reports
    /// [`TransitionWrite::Superseded`] when the row is no longer in `from`.
    async fn record_transition(
        &self,
        id: i64,
        from: DeliveryStatus,
        to: DeliveryStatus,
        previous_timestamp: Option<DateTime<Utc>>,
    ) -> Result<TransitionWrite>;

    /// Records of `feed` within `[day 00:00, +24h)` UTC, ascending.
    async fn fetch_day(&self, feed: &FeedType, day: NaiveDate) -> Result<Vec<ExpectedDelivery>>;
}

/// Receiver of transition events (push transport, test recorder, ...).
pub trait ChangeSink: Send + Sync {
    fn publish(&self, event: &ChangeEvent);
}
