use std::fmt;

/// Faults raised while talking to the remote source.
///
/// Connection-level faults (`Connect`, `Auth`, `Session`, `Timeout`) describe
/// the source as a whole and abort a probe. `Stat` is specific to one path and
/// only advances to the next candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeError {
    /// TCP connect or address resolution failed.
    Connect { target: String, reason: String },
    /// Credentials were rejected.
    Auth { target: String, reason: String },
    /// SSH handshake or SFTP subsystem initialisation failed.
    Session { target: String, reason: String },
    /// A remote operation exceeded the configured timeout.
    Timeout { target: String, stage: &'static str },
    /// The path could not be stat'ed (absent, permission, ...).
    Stat { path: String, reason: String },
    /// The probe worker itself failed (panicked or was cancelled).
    Worker(String),
}

impl ProbeError {
    pub fn is_connection_fault(&self) -> bool {
        !matches!(self, ProbeError::Stat { .. })
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Connect { target, reason } => {
                write!(f, "connect to {target} failed: {reason}")
            }
            ProbeError::Auth { target, reason } => {
                write!(f, "authentication to {target} failed: {reason}")
            }
            ProbeError::Session { target, reason } => {
                write!(f, "session setup with {target} failed: {reason}")
            }
            ProbeError::Timeout { target, stage } => {
                write!(f, "{stage} against {target} timed out")
            }
            ProbeError::Stat { path, reason } => write!(f, "stat {path} failed: {reason}"),
            ProbeError::Worker(msg) => write!(f, "probe worker failed: {msg}"),
        }
    }
}

impl std::error::Error for ProbeError {}
