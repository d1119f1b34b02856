//! fw-reconcile
//!
//! Expected-delivery model and the arrival state machine.
//!
//! - Every (feed type, slot) pair is one `ExpectedDelivery`.
//! - `expected` and `delayed` are re-evaluated each pass; `missing` and
//!   `received` are terminal.
//! - A failed probe inside the delay threshold is `delayed`, past it `missing`.
//! - `previous_timestamp` is the latest already-received slot of the same feed
//!   at evaluation time.
//!
//! Deterministic, pure logic. No IO. No remote calls. No store access.

mod engine;
mod filenames;
mod schedule;
mod types;

pub use engine::{evaluate, DelayPolicy, LastReceivedIndex, Transition};
pub use filenames::{candidate_filenames, canonical_filename};
pub use schedule::{day_start, default_feed_schedules, expected_for_day, FeedSchedule, ScheduleError};
pub use types::*;
