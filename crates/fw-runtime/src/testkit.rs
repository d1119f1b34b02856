//! In-memory collaborators for exercising the runtime without Postgres or a
//! remote host.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use fw_probe::{ExistenceProbe, ProbeOutcome};
use fw_reconcile::{ChangeEvent, DeliveryStatus, ExpectedDelivery, FeedType, NewDelivery};

use crate::{ChangeSink, DeliveryStore, TransitionWrite, UpsertOutcome};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    rows: Vec<ExpectedDelivery>,
    next_id: i64,
    fail_transition_ids: HashSet<i64>,
    fail_reads: bool,
    transition_writes: usize,
}

/// `DeliveryStore` backed by a vector.
///
/// Unlike the Postgres store, `fetch_due` returns terminal rows too, so the
/// pass's own terminal guard is observable.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing the generator. Returns its id.
    pub fn insert(&self, feed: FeedType, timestamp: DateTime<Utc>, status: DeliveryStatus) -> i64 {
        let mut st = lock(&self.state);
        st.next_id += 1;
        let id = st.next_id;
        st.rows.push(ExpectedDelivery {
            id,
            feed_type: feed,
            timestamp,
            status,
            filename: None,
            previous_timestamp: None,
        });
        id
    }

    pub fn rows(&self) -> Vec<ExpectedDelivery> {
        let mut rows = lock(&self.state).rows.clone();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        rows
    }

    pub fn find(&self, feed: &FeedType, timestamp: DateTime<Utc>) -> Option<ExpectedDelivery> {
        lock(&self.state)
            .rows
            .iter()
            .find(|r| &r.feed_type == feed && r.timestamp == timestamp)
            .cloned()
    }

    /// Overwrite a row's status out of band, as a concurrent writer would.
    pub fn set_status(&self, id: i64, status: DeliveryStatus) {
        if let Some(row) = lock(&self.state).rows.iter_mut().find(|r| r.id == id) {
            row.status = status;
        }
    }

    /// Make `record_transition` fail for this id.
    pub fn fail_transition_for(&self, id: i64) {
        lock(&self.state).fail_transition_ids.insert(id);
    }

    /// Make `last_received` and `fetch_due` fail.
    pub fn fail_reads(&self, fail: bool) {
        lock(&self.state).fail_reads = fail;
    }

    /// Successful `record_transition` calls so far.
    pub fn transition_writes(&self) -> usize {
        lock(&self.state).transition_writes
    }
}

#[async_trait::async_trait]
impl DeliveryStore for MemoryStore {
    async fn upsert_expected(&self, slot: &NewDelivery) -> Result<UpsertOutcome> {
        let mut st = lock(&self.state);
        if let Some(row) = st
            .rows
            .iter_mut()
            .find(|r| r.feed_type == slot.feed_type && r.timestamp == slot.timestamp)
        {
            if row.filename.is_none() {
                row.filename = Some(slot.filename.clone());
            }
            return Ok(UpsertOutcome::Existing);
        }

        st.next_id += 1;
        let id = st.next_id;
        st.rows.push(ExpectedDelivery {
            id,
            feed_type: slot.feed_type.clone(),
            timestamp: slot.timestamp,
            status: DeliveryStatus::Expected,
            filename: Some(slot.filename.clone()),
            previous_timestamp: None,
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn last_received(&self) -> Result<Vec<(FeedType, DateTime<Utc>)>> {
        let st = lock(&self.state);
        if st.fail_reads {
            return Err(anyhow!("memory store: reads disabled"));
        }
        let mut latest: Vec<(FeedType, DateTime<Utc>)> = Vec::new();
        for row in st.rows.iter().filter(|r| r.status == DeliveryStatus::Received) {
            match latest.iter_mut().find(|(f, _)| f == &row.feed_type) {
                Some((_, ts)) if *ts < row.timestamp => *ts = row.timestamp,
                Some(_) => {}
                None => latest.push((row.feed_type.clone(), row.timestamp)),
            }
        }
        Ok(latest)
    }

    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<ExpectedDelivery>> {
        if lock(&self.state).fail_reads {
            return Err(anyhow!("memory store: reads disabled"));
        }
        Ok(self.rows().into_iter().filter(|r| r.timestamp <= now).collect())
    }

    async fn record_transition(
        &self,
        id: i64,
        from: DeliveryStatus,
        to: DeliveryStatus,
        previous_timestamp: Option<DateTime<Utc>>,
    ) -> Result<TransitionWrite> {
        let mut st = lock(&self.state);
        if st.fail_transition_ids.contains(&id) {
            return Err(anyhow!("memory store: write refused for id={id}"));
        }
        let row = st
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("memory store: no row id={id}"))?;
        if row.status != from {
            return Ok(TransitionWrite::Superseded);
        }
        row.status = to;
        row.previous_timestamp = previous_timestamp;
        st.transition_writes += 1;
        Ok(TransitionWrite::Applied)
    }

    async fn fetch_day(&self, feed: &FeedType, day: NaiveDate) -> Result<Vec<ExpectedDelivery>> {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::hours(24);
        Ok(self
            .rows()
            .into_iter()
            .filter(|r| &r.feed_type == feed && r.timestamp >= start && r.timestamp < end)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ScriptedProbe
// ---------------------------------------------------------------------------

/// `ExistenceProbe` answering from a set of arrived (feed, slot) pairs.
#[derive(Default)]
pub struct ScriptedProbe {
    arrived: Mutex<HashSet<(FeedType, DateTime<Utc>)>>,
    calls: Mutex<Vec<(FeedType, DateTime<Utc>)>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// From now on the file for (feed, slot) is present.
    pub fn arrive(&self, feed: FeedType, timestamp: DateTime<Utc>) {
        lock(&self.arrived).insert((feed, timestamp));
    }

    /// Every probe call, in order.
    pub fn calls(&self) -> Vec<(FeedType, DateTime<Utc>)> {
        lock(&self.calls).clone()
    }
}

#[async_trait::async_trait]
impl ExistenceProbe for ScriptedProbe {
    async fn probe(&self, base_path: &str, feed: &FeedType, timestamp: DateTime<Utc>) -> ProbeOutcome {
        lock(&self.calls).push((feed.clone(), timestamp));
        if lock(&self.arrived).contains(&(feed.clone(), timestamp)) {
            ProbeOutcome::Found {
                path: format!("{}/{}", base_path.trim_end_matches('/'), feed),
            }
        } else {
            ProbeOutcome::Absent { tried: 1 }
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        lock(&self.events).clone()
    }
}

impl ChangeSink for RecordingSink {
    fn publish(&self, event: &ChangeEvent) {
        lock(&self.events).push(event.clone());
    }
}
