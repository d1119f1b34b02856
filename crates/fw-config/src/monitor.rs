//! Typed view over the merged config JSON.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use fw_reconcile::{default_feed_schedules, DelayPolicy, FeedSchedule, FeedType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest accepted delayed-to-missing threshold: one full day.
pub const MAX_DELAY_THRESHOLD_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub remote: RemoteSection,
    pub feeds: Vec<FeedEntry>,
    pub monitor: MonitorSection,
    pub notify: NotifySection,
    pub daemon: DaemonSection,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            remote: RemoteSection::default(),
            feeds: default_feed_schedules()
                .iter()
                .map(|s| FeedEntry {
                    feed_type: s.feed_type().to_string(),
                    interval_hours: s.interval_hours(),
                })
                .collect(),
            monitor: MonitorSection::default(),
            notify: NotifySection::default(),
            daemon: DaemonSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    pub host: Option<String>,
    pub port: u16,
    /// Directory the candidate filenames are joined onto. Absence is
    /// reported by every pass rather than at load time.
    pub base_path: Option<String>,
    pub connect_timeout_secs: u64,
    pub credentials_env: CredentialsEnv,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            host: None,
            port: 22,
            base_path: None,
            connect_timeout_secs: 10,
            credentials_env: CredentialsEnv::default(),
        }
    }
}

/// Env var NAMES holding the remote login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsEnv {
    pub username: String,
    pub password: String,
}

impl Default for CredentialsEnv {
    fn default() -> Self {
        Self {
            username: "FW_REMOTE_USERNAME".to_string(),
            password: "FW_REMOTE_PASSWORD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub feed_type: String,
    pub interval_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub delay_threshold_minutes: i64,
    pub pass_interval_secs: u64,
    /// Six-field cron expression (with seconds), evaluated in UTC.
    pub regenerate_cron: String,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            delay_threshold_minutes: 10,
            pass_interval_secs: 60,
            regenerate_cron: "0 0 0 * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    /// Env var NAME holding the alert webhook URL.
    pub webhook_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    pub addr: String,
    pub allowed_origins: Vec<String>,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl MonitorConfig {
    /// Deserialize with defaults, then validate every derived value.
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let cfg: MonitorConfig =
            serde_json::from_value(config_json.clone()).context("config does not match the monitor schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.feed_schedules()?;
        self.regenerate_schedule()?;
        self.daemon_addr()?;
        if !(1..=MAX_DELAY_THRESHOLD_MINUTES).contains(&self.monitor.delay_threshold_minutes) {
            bail!(
                "CONFIG_INVALID monitor.delay_threshold_minutes={} (must be in 1..={MAX_DELAY_THRESHOLD_MINUTES})",
                self.monitor.delay_threshold_minutes
            );
        }
        if self.monitor.pass_interval_secs == 0 {
            bail!("CONFIG_INVALID monitor.pass_interval_secs must be > 0");
        }
        if self.remote.port == 0 {
            bail!("CONFIG_INVALID remote.port must be > 0");
        }
        if self.remote.connect_timeout_secs == 0 {
            bail!("CONFIG_INVALID remote.connect_timeout_secs must be > 0");
        }
        Ok(())
    }

    /// One schedule per configured feed. Feed names are normalised; a feed
    /// listed twice is rejected.
    pub fn feed_schedules(&self) -> Result<Vec<FeedSchedule>> {
        if self.feeds.is_empty() {
            bail!("CONFIG_INVALID feeds: at least one feed must be configured");
        }
        let mut seen = BTreeSet::new();
        let mut out = Vec::with_capacity(self.feeds.len());
        for entry in &self.feeds {
            let feed = FeedType::from_name(&entry.feed_type);
            if feed.as_str().is_empty() {
                bail!("CONFIG_INVALID feeds: empty feed_type");
            }
            if !seen.insert(feed.clone()) {
                bail!("CONFIG_INVALID feeds: feed '{feed}' listed more than once");
            }
            out.push(FeedSchedule::new(feed, entry.interval_hours).context("CONFIG_INVALID feeds")?);
        }
        Ok(out)
    }

    pub fn feed_types(&self) -> Vec<FeedType> {
        self.feeds.iter().map(|e| FeedType::from_name(&e.feed_type)).collect()
    }

    pub fn delay_policy(&self) -> DelayPolicy {
        DelayPolicy::from_minutes(
            self.monitor
                .delay_threshold_minutes
                .clamp(1, MAX_DELAY_THRESHOLD_MINUTES),
        )
    }

    pub fn pass_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.pass_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.connect_timeout_secs)
    }

    pub fn regenerate_schedule(&self) -> Result<cron::Schedule> {
        cron::Schedule::from_str(&self.monitor.regenerate_cron).with_context(|| {
            format!(
                "CONFIG_INVALID monitor.regenerate_cron='{}'",
                self.monitor.regenerate_cron
            )
        })
    }

    pub fn daemon_addr(&self) -> Result<SocketAddr> {
        self.daemon
            .addr
            .parse()
            .with_context(|| format!("CONFIG_INVALID daemon.addr='{}'", self.daemon.addr))
    }

    /// Trimmed base path, `None` when unset or blank.
    pub fn base_path(&self) -> Option<String> {
        self.remote
            .base_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }

    pub fn remote_host(&self) -> Result<&str> {
        match self.remote.host.as_deref().map(str::trim) {
            Some(h) if !h.is_empty() => Ok(h),
            _ => bail!("CONFIG_MISSING remote.host is not configured"),
        }
    }
}
