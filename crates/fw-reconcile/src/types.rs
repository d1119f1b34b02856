use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FeedType
// ---------------------------------------------------------------------------

/// Category of periodically delivered data file.
///
/// The four known feeds have dedicated variants; anything else is carried as
/// `Other` with its lowercase name so new feeds only need configuration.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeedType {
    Metar,
    Synop,
    Buoy,
    Ship,
    Other(String),
}

impl FeedType {
    pub fn as_str(&self) -> &str {
        match self {
            FeedType::Metar => "metar",
            FeedType::Synop => "synop",
            FeedType::Buoy => "buoy",
            FeedType::Ship => "ship",
            FeedType::Other(name) => name.as_str(),
        }
    }

    /// Normalise a feed name (trimmed, lowercase) into a `FeedType`.
    pub fn from_name(name: &str) -> Self {
        let n = name.trim().to_ascii_lowercase();
        match n.as_str() {
            "metar" => FeedType::Metar,
            "synop" => FeedType::Synop,
            "buoy" => FeedType::Buoy,
            "ship" => FeedType::Ship,
            _ => FeedType::Other(n),
        }
    }

    /// The feeds shipped in the default configuration.
    pub fn known() -> [FeedType; 4] {
        [FeedType::Metar, FeedType::Synop, FeedType::Buoy, FeedType::Ship]
    }
}

impl From<String> for FeedType {
    fn from(s: String) -> Self {
        FeedType::from_name(&s)
    }
}

impl From<&str> for FeedType {
    fn from(s: &str) -> Self {
        FeedType::from_name(s)
    }
}

impl From<FeedType> for String {
    fn from(f: FeedType) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DeliveryStatus
// ---------------------------------------------------------------------------

/// Lifecycle of one expected delivery.
///
/// `Expected` is initial. `Missing` and `Received` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Expected,
    Delayed,
    Missing,
    Received,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Expected => "expected",
            DeliveryStatus::Delayed => "delayed",
            DeliveryStatus::Missing => "missing",
            DeliveryStatus::Received => "received",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownStatus> {
        match s.trim() {
            "expected" => Ok(DeliveryStatus::Expected),
            "delayed" => Ok(DeliveryStatus::Delayed),
            "missing" => Ok(DeliveryStatus::Missing),
            "received" => Ok(DeliveryStatus::Received),
            other => Err(UnknownStatus(other.to_string())),
        }
    }

    /// `true` for states the reconciliation pass never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Missing | DeliveryStatus::Received)
    }

    /// `true` for states that are re-probed on every pass.
    pub fn awaits_arrival(&self) -> bool {
        !self.is_terminal()
    }

    pub fn all() -> [DeliveryStatus; 4] {
        [
            DeliveryStatus::Expected,
            DeliveryStatus::Delayed,
            DeliveryStatus::Missing,
            DeliveryStatus::Received,
        ]
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status string read from storage that is not one of the four states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid delivery status '{}'; expected one of: expected | delayed | missing | received",
            self.0
        )
    }
}

impl std::error::Error for UnknownStatus {}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One stored (feed type, slot) record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedDelivery {
    /// Store-assigned identity.
    pub id: i64,
    pub feed_type: FeedType,
    /// UTC instant the delivery is expected.
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
    /// Canonical filename assigned at generation time. Never rewritten with the
    /// candidate that actually matched during probing.
    pub filename: Option<String>,
    /// Latest slot of the same feed already received when this record last
    /// changed state. Display/audit only.
    pub previous_timestamp: Option<DateTime<Utc>>,
}

/// A slot produced by the schedule generator, before the store assigns an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewDelivery {
    pub feed_type: FeedType,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
}

/// Payload emitted exactly once per status transition.
///
/// Wire form (JSON, snake_case keys, RFC 3339 instants, absent values as
/// `null`), as carried by the `status_update` stream event:
///
/// ```json
/// {"feed_type":"metar","timestamp":"2024-01-01T02:00:00Z","status":"missing",
///  "filename":"mmetar2.csv","previous_timestamp":"2024-01-01T01:00:00Z"}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub feed_type: FeedType,
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub filename: Option<String>,
    pub previous_timestamp: Option<DateTime<Utc>>,
}
