use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::{ChangeEvent, DeliveryStatus, ExpectedDelivery, FeedType};

// ---------------------------------------------------------------------------
// LastReceivedIndex
// ---------------------------------------------------------------------------

/// Per-pass accumulator: feed type -> latest slot known to be `received`.
///
/// Seeded from the store at the start of a pass and advanced as the pass
/// discovers new arrivals. Never persisted and never shared across passes.
///
/// # Invariant
/// A feed's entry only moves forward. Recording an older arrival (a delayed
/// slot that finally shows up after a later one) leaves the entry untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LastReceivedIndex {
    latest: BTreeMap<FeedType, DateTime<Utc>>,
}

impl LastReceivedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (feed, timestamp) pairs as returned by the store aggregate.
    /// Repeated feeds keep their maximum.
    pub fn seeded<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (FeedType, DateTime<Utc>)>,
    {
        let mut idx = Self::new();
        for (feed, ts) in pairs {
            idx.record(feed, ts);
        }
        idx
    }

    pub fn get(&self, feed: &FeedType) -> Option<DateTime<Utc>> {
        self.latest.get(feed).copied()
    }

    /// Advance `feed` to `ts` if it is newer than the current entry.
    /// Returns `true` when the entry changed.
    pub fn record(&mut self, feed: FeedType, ts: DateTime<Utc>) -> bool {
        match self.latest.get_mut(&feed) {
            Some(cur) if *cur >= ts => false,
            Some(cur) => {
                *cur = ts;
                true
            }
            None => {
                self.latest.insert(feed, ts);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DelayPolicy
// ---------------------------------------------------------------------------

/// Boundary between `delayed` and `missing` for an absent file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayPolicy {
    pub threshold: Duration,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::from_minutes(10)
    }
}

impl DelayPolicy {
    pub fn from_minutes(minutes: i64) -> Self {
        Self {
            threshold: Duration::minutes(minutes),
        }
    }

    /// Status of a slot whose file was not found at `now`.
    ///
    /// Elapsed strictly below the threshold is `delayed`; at or above it,
    /// `missing`.
    pub fn classify_absent(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> DeliveryStatus {
        if now.signed_duration_since(timestamp) < self.threshold {
            DeliveryStatus::Delayed
        } else {
            DeliveryStatus::Missing
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation step
// ---------------------------------------------------------------------------

/// A status change produced by [`evaluate`]; persist it, then publish `event`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub delivery_id: i64,
    pub from: DeliveryStatus,
    pub event: ChangeEvent,
}

impl Transition {
    pub fn to(&self) -> DeliveryStatus {
        self.event.status
    }

    pub fn previous_timestamp(&self) -> Option<DateTime<Utc>> {
        self.event.previous_timestamp
    }
}

/// Advance one due record given the probe result.
///
/// - `previous_timestamp` is captured from `index` **before** the index is
///   updated, so a record never names itself as its predecessor.
/// - On `found`, the index is advanced to the record's slot so later records
///   of the same feed in this pass see it.
/// - Returns `None` when the computed status equals the current one (no
///   write, no event).
///
/// Callers only pass records whose status awaits arrival and whose timestamp
/// is at or before `now`; terminal records yield `None` without touching the
/// index.
pub fn evaluate(
    record: &ExpectedDelivery,
    found: bool,
    now: DateTime<Utc>,
    policy: &DelayPolicy,
    index: &mut LastReceivedIndex,
) -> Option<Transition> {
    if record.status.is_terminal() {
        return None;
    }

    let prior = index.get(&record.feed_type);

    let next = if found {
        index.record(record.feed_type.clone(), record.timestamp);
        DeliveryStatus::Received
    } else {
        policy.classify_absent(record.timestamp, now)
    };

    if next == record.status {
        return None;
    }

    Some(Transition {
        delivery_id: record.id,
        from: record.status,
        event: ChangeEvent {
            feed_type: record.feed_type.clone(),
            timestamp: record.timestamp,
            status: next,
            filename: record.filename.clone(),
            previous_timestamp: prior,
        },
    })
}
