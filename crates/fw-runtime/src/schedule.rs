use chrono::NaiveDate;
use fw_reconcile::{expected_for_day, FeedSchedule};
use serde::Serialize;
use tracing::{error, info};

use crate::{DeliveryStore, UpsertOutcome};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerateReport {
    pub day: NaiveDate,
    pub inserted: usize,
    pub existing: usize,
    pub failed: usize,
}

/// Upsert every slot of `day` for the configured feeds.
///
/// Safe to repeat: existing rows keep their status. A failed upsert is logged
/// and counted; the remaining slots are still written.
pub async fn generate_day<S>(store: &S, feeds: &[FeedSchedule], day: NaiveDate) -> GenerateReport
where
    S: DeliveryStore + ?Sized,
{
    let mut report = GenerateReport {
        day,
        inserted: 0,
        existing: 0,
        failed: 0,
    };

    for slot in expected_for_day(day, feeds) {
        match store.upsert_expected(&slot).await {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::Existing) => report.existing += 1,
            Err(err) => {
                error!(
                    feed_type = %slot.feed_type,
                    timestamp = %slot.timestamp.to_rfc3339(),
                    error = %format!("{err:#}"),
                    "failed to upsert expected delivery"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        day = %day,
        inserted = report.inserted,
        existing = report.existing,
        failed = report.failed,
        "expected deliveries generated"
    );
    report
}
