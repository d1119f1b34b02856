use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

use crate::{canonical_filename, FeedType, NewDelivery};

// ---------------------------------------------------------------------------
// FeedSchedule
// ---------------------------------------------------------------------------

/// Delivery cadence of one feed type: one slot every `interval_hours`,
/// starting at 00:00 UTC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedSchedule {
    feed_type: FeedType,
    interval_hours: u32,
}

impl FeedSchedule {
    /// `interval_hours` must be in `1..=24`.
    pub fn new(feed_type: FeedType, interval_hours: u32) -> Result<Self, ScheduleError> {
        if !(1..=24).contains(&interval_hours) {
            return Err(ScheduleError::InvalidInterval {
                feed_type,
                interval_hours,
            });
        }
        Ok(Self {
            feed_type,
            interval_hours,
        })
    }

    pub fn feed_type(&self) -> &FeedType {
        &self.feed_type
    }

    pub fn interval_hours(&self) -> u32 {
        self.interval_hours
    }

    /// Slot hours within a day: `0, interval, 2*interval, ...` below 24.
    pub fn slot_hours(&self) -> impl Iterator<Item = u32> {
        (0..24).step_by(self.interval_hours as usize)
    }
}

/// metar, buoy, ship hourly; synop every three hours.
pub fn default_feed_schedules() -> Vec<FeedSchedule> {
    vec![
        FeedSchedule {
            feed_type: FeedType::Metar,
            interval_hours: 1,
        },
        FeedSchedule {
            feed_type: FeedType::Synop,
            interval_hours: 3,
        },
        FeedSchedule {
            feed_type: FeedType::Buoy,
            interval_hours: 1,
        },
        FeedSchedule {
            feed_type: FeedType::Ship,
            interval_hours: 1,
        },
    ]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    InvalidInterval {
        feed_type: FeedType,
        interval_hours: u32,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::InvalidInterval {
                feed_type,
                interval_hours,
            } => write!(
                f,
                "invalid interval for feed '{feed_type}': {interval_hours}h (must be 1..=24)"
            ),
        }
    }
}

impl std::error::Error for ScheduleError {}

// ---------------------------------------------------------------------------
// Day enumeration
// ---------------------------------------------------------------------------

/// Truncate an instant to 00:00:00 UTC of its day.
pub fn day_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Every expected delivery for `day`, feed by feed, slots ascending.
///
/// Exactly one entry per (feed type, slot). Feeds listed twice in `feeds` are
/// enumerated once (first occurrence wins).
pub fn expected_for_day(day: NaiveDate, feeds: &[FeedSchedule]) -> Vec<NewDelivery> {
    let midnight = day.and_time(chrono::NaiveTime::MIN).and_utc();
    let mut seen: Vec<&FeedType> = Vec::new();
    let mut out = Vec::new();

    for sched in feeds {
        if seen.contains(&&sched.feed_type) {
            continue;
        }
        seen.push(&sched.feed_type);

        for hour in sched.slot_hours() {
            let timestamp = midnight + Duration::hours(i64::from(hour));
            debug_assert_eq!(timestamp.hour(), hour);
            out.push(NewDelivery {
                feed_type: sched.feed_type.clone(),
                timestamp,
                filename: canonical_filename(&sched.feed_type, hour),
            });
        }
    }
    out
}
