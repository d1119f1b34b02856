use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use fw_reconcile::{DeliveryStatus, ExpectedDelivery, FeedType, NewDelivery};
use sqlx::PgPool;

use crate::{DeliveryStore, TransitionWrite, UpsertOutcome};

/// [`DeliveryStore`] over the `expected_deliveries` table.
#[derive(Clone, Debug)]
pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl DeliveryStore for PgDeliveryStore {
    async fn upsert_expected(&self, slot: &NewDelivery) -> Result<UpsertOutcome> {
        fw_db::upsert_expected(&self.pool, slot).await
    }

    async fn last_received(&self) -> Result<Vec<(FeedType, DateTime<Utc>)>> {
        fw_db::last_received_by_feed(&self.pool).await
    }

    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<ExpectedDelivery>> {
        fw_db::fetch_due(&self.pool, now).await
    }

    async fn record_transition(
        &self,
        id: i64,
        from: DeliveryStatus,
        to: DeliveryStatus,
        previous_timestamp: Option<DateTime<Utc>>,
    ) -> Result<TransitionWrite> {
        fw_db::record_transition(&self.pool, id, from, to, previous_timestamp).await
    }

    async fn fetch_day(&self, feed: &FeedType, day: NaiveDate) -> Result<Vec<ExpectedDelivery>> {
        fw_db::fetch_day(&self.pool, feed, day).await
    }
}
