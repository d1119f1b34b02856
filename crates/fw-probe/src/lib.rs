//! fw-probe
//!
//! Remote existence prober: decides whether a slot's file is present on the
//! remote source, trying the feed's candidate filenames in priority order.
//!
//! Remote faults never escape a probe. They are logged with path, feed type
//! and timestamp and resolve to "not found".

mod error;
mod probe;
mod sftp;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fw_reconcile::FeedType;
use tracing::error;

pub use error::ProbeError;
pub use probe::{probe_candidates, remote_path, Connector, EntryKind, ProbeOutcome, RemoteSession};
pub use sftp::{SftpConnector, SftpSession};

/// Async existence check used by the reconciliation pass.
#[async_trait::async_trait]
pub trait ExistenceProbe: Send + Sync {
    async fn probe(&self, base_path: &str, feed: &FeedType, timestamp: DateTime<Utc>)
        -> ProbeOutcome;
}

/// Runs [`probe_candidates`] on the tokio blocking pool.
///
/// One probe at a time per call; sessions are never shared across candidates.
pub struct RemoteProber<C> {
    connector: Arc<C>,
}

impl<C> RemoteProber<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }
}

#[async_trait::async_trait]
impl<C> ExistenceProbe for RemoteProber<C>
where
    C: Connector + 'static,
{
    async fn probe(
        &self,
        base_path: &str,
        feed: &FeedType,
        timestamp: DateTime<Utc>,
    ) -> ProbeOutcome {
        let connector = Arc::clone(&self.connector);
        let base = base_path.to_string();
        let feed_owned = feed.clone();

        let joined = tokio::task::spawn_blocking(move || {
            probe_candidates(connector.as_ref(), &base, &feed_owned, timestamp)
        })
        .await;

        match joined {
            Ok(outcome) => outcome,
            Err(join_err) => {
                error!(
                    feed_type = %feed,
                    timestamp = %timestamp.to_rfc3339(),
                    error = %join_err,
                    "probe worker failed"
                );
                ProbeOutcome::Unreachable {
                    error: ProbeError::Worker(join_err.to_string()),
                }
            }
        }
    }
}
