//! Candidate-by-candidate existence check.
//!
//! One probe walks the ordered candidate list for a slot. Each attempt opens
//! its own session, stats one path and closes the session again:
//!
//! - regular file          -> `Found`, stop
//! - not a regular file    -> next candidate
//! - stat failure          -> next candidate
//! - connection-level fault -> `Unreachable`, stop (the fault is source-wide)
//! - list exhausted        -> `Absent`

use chrono::{DateTime, Timelike, Utc};
use fw_reconcile::{candidate_filenames, FeedType};
use tracing::{debug, error, info, warn};

use crate::ProbeError;

// ---------------------------------------------------------------------------
// Remote seam
// ---------------------------------------------------------------------------

/// What a successful stat saw at the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    /// Directory, symlink target that is not a file, device, ...
    Other,
}

/// One authenticated session against the remote source.
///
/// Dropping the session closes it.
pub trait RemoteSession {
    fn stat(&mut self, path: &str) -> Result<EntryKind, ProbeError>;
}

/// Opens fresh sessions. Blocking; run on a blocking thread.
pub trait Connector: Send + Sync {
    type Session: RemoteSession;

    /// Connect and authenticate. Any error here is a connection-level fault.
    fn connect(&self) -> Result<Self::Session, ProbeError>;

    /// Human-readable target for logs (`user@host:port`, no secrets).
    fn target(&self) -> String;
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A candidate exists as a regular file at `path`.
    Found { path: String },
    /// Every candidate was tried; none is a regular file.
    Absent { tried: usize },
    /// The source could not be reached; remaining candidates were not tried.
    Unreachable { error: ProbeError },
}

impl ProbeOutcome {
    /// Only `Found` counts as present; faults resolve to "not found".
    pub fn is_found(&self) -> bool {
        matches!(self, ProbeOutcome::Found { .. })
    }

    pub fn matched_path(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Found { path } => Some(path.as_str()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

enum Step {
    Try(usize),
    Done(ProbeOutcome),
}

/// Join a remote directory and a filename with exactly one `/`.
pub fn remote_path(base_path: &str, filename: &str) -> String {
    let base = base_path.trim_end_matches('/');
    if base.is_empty() && base_path.starts_with('/') {
        format!("/{filename}")
    } else {
        format!("{base}/{filename}")
    }
}

/// Run one probe for (`feed`, `timestamp`) under `base_path`.
///
/// Never fails: remote faults are logged and folded into the outcome.
pub fn probe_candidates<C: Connector + ?Sized>(
    connector: &C,
    base_path: &str,
    feed: &FeedType,
    timestamp: DateTime<Utc>,
) -> ProbeOutcome {
    let candidates = candidate_filenames(feed, timestamp.hour());
    let ts = timestamp.to_rfc3339();
    let mut step = Step::Try(0);

    loop {
        step = match step {
            Step::Done(outcome) => return outcome,

            Step::Try(i) if i >= candidates.len() => {
                warn!(
                    feed_type = %feed,
                    timestamp = %ts,
                    tried = i,
                    "no candidate filename matched a regular file"
                );
                Step::Done(ProbeOutcome::Absent { tried: i })
            }

            Step::Try(i) => {
                let path = remote_path(base_path, &candidates[i]);
                debug!(feed_type = %feed, timestamp = %ts, %path, "checking remote file");

                match connector.connect() {
                    Err(err) => {
                        error!(
                            feed_type = %feed,
                            timestamp = %ts,
                            %path,
                            target = %connector.target(),
                            error = %err,
                            "remote source unavailable; probe aborted"
                        );
                        Step::Done(ProbeOutcome::Unreachable { error: err })
                    }
                    Ok(mut session) => match session.stat(&path) {
                        Ok(EntryKind::File) => {
                            info!(feed_type = %feed, timestamp = %ts, %path, "file found");
                            Step::Done(ProbeOutcome::Found { path })
                        }
                        Ok(EntryKind::Other) => {
                            warn!(
                                feed_type = %feed,
                                timestamp = %ts,
                                %path,
                                "path exists but is not a regular file"
                            );
                            Step::Try(i + 1)
                        }
                        Err(err) if err.is_connection_fault() => {
                            error!(
                                feed_type = %feed,
                                timestamp = %ts,
                                %path,
                                error = %err,
                                "remote source fault during stat; probe aborted"
                            );
                            Step::Done(ProbeOutcome::Unreachable { error: err })
                        }
                        Err(err) => {
                            debug!(feed_type = %feed, timestamp = %ts, %path, error = %err, "candidate not present");
                            Step::Try(i + 1)
                        }
                    },
                }
            }
        };
    }
}
