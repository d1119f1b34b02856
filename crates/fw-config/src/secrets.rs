//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (e.g. `"FW_REMOTE_PASSWORD"`).
//! - Callers invoke [`resolve_secrets`] once at startup and pass the result
//!   into constructors; no other module reads credentials from the env.
//! - `Debug` redacts values. Errors name the env var, never its value.

use anyhow::{bail, Result};

use crate::MonitorConfig;

/// Credentials resolved from the environment.
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub remote_username: Option<String>,
    pub remote_password: Option<String>,
    /// Alert webhook URL. Always optional.
    pub alert_webhook: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "remote_username",
                &self.remote_username.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "remote_password",
                &self.remote_password.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "alert_webhook",
                &self.alert_webhook.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRequirement {
    /// Remote login must be present (daemon, `fw pass`, `fw probe`).
    RemoteRequired,
    /// Nothing required (schedule seeding, db commands).
    Optional,
}

/// Unset or blank resolves to `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve the remote login and alert webhook named by `cfg`.
///
/// # Errors
/// With `RemoteRequired`, the NAME of the first missing remote variable.
pub fn resolve_secrets(cfg: &MonitorConfig, requirement: SecretRequirement) -> Result<ResolvedSecrets> {
    let names = &cfg.remote.credentials_env;
    let remote_username = resolve_env(&names.username);
    let remote_password = resolve_env(&names.password);

    if requirement == SecretRequirement::RemoteRequired {
        if remote_username.is_none() {
            bail!(
                "SECRETS_MISSING: required env var '{}' (remote username) is not set or empty",
                names.username,
            );
        }
        if remote_password.is_none() {
            bail!(
                "SECRETS_MISSING: required env var '{}' (remote password) is not set or empty",
                names.password,
            );
        }
    }

    let alert_webhook = cfg.notify.webhook_env.as_deref().and_then(resolve_env);

    Ok(ResolvedSecrets {
        remote_username,
        remote_password,
        alert_webhook,
    })
}
