use chrono::{DateTime, Utc};
use fw_probe::ExistenceProbe;
use fw_reconcile::{evaluate, DelayPolicy, DeliveryStatus, LastReceivedIndex};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{ChangeSink, DeliveryStore, TransitionWrite};

/// Inputs of one reconciliation pass that come from configuration.
#[derive(Clone, Debug, Default)]
pub struct PassSettings {
    /// Remote directory the candidate filenames are joined onto.
    pub base_path: Option<String>,
    pub policy: DelayPolicy,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Records returned by the due query.
    pub due: usize,
    pub probed: usize,
    pub skipped_terminal: usize,
    /// Transitions persisted and published.
    pub transitions: usize,
    pub persist_failures: usize,
    /// Transitions dropped because another writer moved the row first.
    pub superseded: usize,
    pub received: usize,
    pub delayed: usize,
    pub missing: usize,
}

#[derive(Debug)]
pub enum PassError {
    /// Pass cannot start; nothing was probed or written.
    Config(String),
    /// Reading the pass inputs from the store failed.
    Store(anyhow::Error),
}

impl std::fmt::Display for PassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassError::Config(msg) => write!(f, "pass config error: {msg}"),
            PassError::Store(err) => write!(f, "pass store error: {err:#}"),
        }
    }
}

impl std::error::Error for PassError {}

/// One reconciliation pass at `now`.
///
/// Seeds the last-received index from the store, then walks due records in
/// ascending timestamp order. Each record is probed, evaluated and, when its
/// status changes, persisted and then published. A failed write is logged
/// and skipped; the event for that record is not published and the pass
/// moves on. A write that finds the row already moved by another writer is
/// dropped the same way but is not counted as a failure.
pub async fn run_pass<S, P, K>(
    store: &S,
    probe: &P,
    sink: &K,
    settings: &PassSettings,
    now: DateTime<Utc>,
) -> Result<PassReport, PassError>
where
    S: DeliveryStore + ?Sized,
    P: ExistenceProbe + ?Sized,
    K: ChangeSink + ?Sized,
{
    let base_path = match settings.base_path.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => {
            return Err(PassError::Config(
                "remote.base_path is not configured".to_string(),
            ))
        }
    };

    let mut index = LastReceivedIndex::seeded(store.last_received().await.map_err(PassError::Store)?);
    let due = store.fetch_due(now).await.map_err(PassError::Store)?;

    let mut report = PassReport {
        due: due.len(),
        ..PassReport::default()
    };
    info!(now = %now.to_rfc3339(), due = due.len(), "reconciliation pass starting");

    for record in &due {
        if record.status.is_terminal() {
            report.skipped_terminal += 1;
            continue;
        }
        if record.timestamp > now {
            continue;
        }

        let outcome = probe.probe(base_path, &record.feed_type, record.timestamp).await;
        report.probed += 1;

        let Some(transition) = evaluate(record, outcome.is_found(), now, &settings.policy, &mut index)
        else {
            debug!(
                feed_type = %record.feed_type,
                timestamp = %record.timestamp.to_rfc3339(),
                status = %record.status,
                "no status change"
            );
            continue;
        };

        match store
            .record_transition(
                transition.delivery_id,
                transition.from,
                transition.to(),
                transition.previous_timestamp(),
            )
            .await
        {
            Ok(TransitionWrite::Applied) => {}
            Ok(TransitionWrite::Superseded) => {
                info!(
                    feed_type = %record.feed_type,
                    timestamp = %record.timestamp.to_rfc3339(),
                    from = %transition.from,
                    to = %transition.to(),
                    "status changed concurrently; transition dropped"
                );
                report.superseded += 1;
                continue;
            }
            Err(err) => {
                error!(
                    feed_type = %record.feed_type,
                    timestamp = %record.timestamp.to_rfc3339(),
                    to = %transition.to(),
                    error = %format!("{err:#}"),
                    "failed to persist status change"
                );
                report.persist_failures += 1;
                continue;
            }
        }

        match transition.to() {
            DeliveryStatus::Received => {
                report.received += 1;
                info!(
                    feed_type = %record.feed_type,
                    timestamp = %record.timestamp.to_rfc3339(),
                    from = %transition.from,
                    path = outcome.matched_path().unwrap_or_default(),
                    "file received"
                );
            }
            DeliveryStatus::Delayed => {
                report.delayed += 1;
                warn!(
                    feed_type = %record.feed_type,
                    timestamp = %record.timestamp.to_rfc3339(),
                    from = %transition.from,
                    "file delayed"
                );
            }
            DeliveryStatus::Missing => {
                report.missing += 1;
                warn!(
                    feed_type = %record.feed_type,
                    timestamp = %record.timestamp.to_rfc3339(),
                    from = %transition.from,
                    "file missing"
                );
            }
            DeliveryStatus::Expected => {}
        }

        sink.publish(&transition.event);
        report.transitions += 1;
    }

    info!(
        due = report.due,
        probed = report.probed,
        transitions = report.transitions,
        persist_failures = report.persist_failures,
        superseded = report.superseded,
        "reconciliation pass complete"
    );
    Ok(report)
}
