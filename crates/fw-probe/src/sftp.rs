//! SFTP connector over libssh2 (`ssh2`).
//!
//! Blocking. Every call to [`SftpConnector::connect`] performs TCP connect,
//! SSH handshake, password auth and SFTP subsystem start, each bounded by the
//! configured timeout.

use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use ssh2::{ErrorCode, Session, Sftp};
use tracing::debug;

use crate::{Connector, EntryKind, ProbeError, RemoteSession};

/// libssh2 `LIBSSH2_ERROR_TIMEOUT`.
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;

#[derive(Clone)]
pub struct SftpConnector {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
}

impl std::fmt::Debug for SftpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpConnector")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SftpConnector {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            timeout,
        }
    }

    fn session_error(&self, stage: &'static str, err: ssh2::Error) -> ProbeError {
        if is_timeout(&err) {
            ProbeError::Timeout {
                target: self.target(),
                stage,
            }
        } else {
            ProbeError::Session {
                target: self.target(),
                reason: format!("{stage}: {err}"),
            }
        }
    }
}

/// Run a blocking call that has no timeout of its own (name resolution) on a
/// helper thread. `None` when it did not finish within `limit`; the helper is
/// left to finish on its own.
fn run_with_deadline<T, F>(limit: Duration, f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("fw-probe-resolve".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        })
        .ok()?;
    rx.recv_timeout(limit).ok()
}

fn is_timeout(err: &ssh2::Error) -> bool {
    matches!(err.code(), ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT))
}

impl Connector for SftpConnector {
    type Session = SftpSession;

    fn connect(&self) -> Result<SftpSession, ProbeError> {
        let host_port = (self.host.clone(), self.port);
        let resolved = run_with_deadline(self.timeout, move || {
            host_port.to_socket_addrs().map(|mut addrs| addrs.next())
        })
        .ok_or_else(|| ProbeError::Timeout {
            target: self.target(),
            stage: "resolve",
        })?;
        let addr = resolved
            .map_err(|e| ProbeError::Connect {
                target: self.target(),
                reason: format!("resolve: {e}"),
            })?
            .ok_or_else(|| ProbeError::Connect {
                target: self.target(),
                reason: "host resolved to no addresses".to_string(),
            })?;

        let tcp = TcpStream::connect_timeout(&addr, self.timeout).map_err(|e| {
            if e.kind() == ErrorKind::TimedOut {
                ProbeError::Timeout {
                    target: self.target(),
                    stage: "tcp connect",
                }
            } else {
                ProbeError::Connect {
                    target: self.target(),
                    reason: e.to_string(),
                }
            }
        })?;
        if let Err(e) = tcp.set_read_timeout(Some(self.timeout)) {
            debug!(remote = %self.target(), error = %e, "could not set socket read timeout");
        }
        if let Err(e) = tcp.set_write_timeout(Some(self.timeout)) {
            debug!(remote = %self.target(), error = %e, "could not set socket write timeout");
        }

        let mut session = Session::new().map_err(|e| self.session_error("session init", e))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX));
        session
            .handshake()
            .map_err(|e| self.session_error("handshake", e))?;

        session
            .userauth_password(&self.username, &self.password)
            .map_err(|e| {
                if is_timeout(&e) {
                    ProbeError::Timeout {
                        target: self.target(),
                        stage: "authenticate",
                    }
                } else {
                    ProbeError::Auth {
                        target: self.target(),
                        reason: e.to_string(),
                    }
                }
            })?;
        if !session.authenticated() {
            return Err(ProbeError::Auth {
                target: self.target(),
                reason: "server did not accept credentials".to_string(),
            });
        }

        let sftp = session
            .sftp()
            .map_err(|e| self.session_error("sftp subsystem", e))?;

        Ok(SftpSession {
            target: self.target(),
            session,
            sftp,
        })
    }

    fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

pub struct SftpSession {
    target: String,
    session: Session,
    sftp: Sftp,
}

impl RemoteSession for SftpSession {
    fn stat(&mut self, path: &str) -> Result<EntryKind, ProbeError> {
        match self.sftp.stat(Path::new(path)) {
            Ok(st) if st.is_file() => Ok(EntryKind::File),
            Ok(_) => Ok(EntryKind::Other),
            Err(e) if is_timeout(&e) => Err(ProbeError::Timeout {
                target: self.target.clone(),
                stage: "stat",
            }),
            Err(e) => Err(ProbeError::Stat {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        let _ = self.session.disconnect(None, "probe complete", None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_returns_result_of_fast_call() {
        assert_eq!(run_with_deadline(Duration::from_secs(5), || 7), Some(7));
    }

    #[test]
    fn deadline_gives_up_on_stalled_call() {
        let started = std::time::Instant::now();
        let out = run_with_deadline(Duration::from_millis(50), || {
            thread::sleep(Duration::from_secs(2));
            1
        });
        assert_eq!(out, None);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn zero_connect_timeout_is_refused_by_the_socket_layer() {
        let addr = "127.0.0.1:9".parse().unwrap();
        let err = TcpStream::connect_timeout(&addr, Duration::ZERO).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
