//! fw-config
//!
//! Layered YAML configuration: documents merge left to right into one JSON
//! value, which is canonicalised and hashed (SHA-256 hex). Credentials never
//! appear as literals; the config names the env vars that hold them.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

mod monitor;
mod secrets;

pub use monitor::{
    CredentialsEnv, DaemonSection, FeedEntry, MonitorConfig, MonitorSection, NotifySection, RemoteSection,
    MAX_DELAY_THRESHOLD_MINUTES,
};
pub use secrets::{resolve_secrets, ResolvedSecrets, SecretRequirement};

pub const ENV_CONFIG_PATHS: &str = "FW_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

/// Leaf strings starting with one of these abort loading with
/// CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ssh-rsa ",   // public key pasted where a name belongs
    "ssh-ed25519 ",
    "ghp_",   // GitHub PAT
    "glpat-", // GitLab PAT
    "xoxb-",  // Slack bot token
    "xoxp-",  // Slack user token
    "https://discord.com/api/webhooks/",
    "https://hooks.slack.com/",
];

/// JSON-pointer prefixes the service actually reads. A leaf under one of
/// these is consumed; anything else is reported as unused.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/remote/host",
    "/remote/port",
    "/remote/base_path",
    "/remote/connect_timeout_secs",
    "/remote/credentials_env/username",
    "/remote/credentials_env/password",
    "/feeds",
    "/monitor/delay_threshold_minutes",
    "/monitor/pass_interval_secs",
    "/monitor/regenerate_cron",
    "/notify/webhook_env",
    "/daemon/addr",
    "/daemon/allowed_origins",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Minimal set of unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Leaves of `config_json` not covered by [`CONSUMED_POINTERS`].
/// With `UnusedKeyPolicy::Fail`, any unused leaf is an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let unused: BTreeSet<String> = leaves(config_json)
        .into_iter()
        .map(|(ptr, _)| ptr)
        .filter(|ptr| !CONSUMED_POINTERS.iter().any(|c| consumes(c, ptr)))
        .collect();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: nothing reads {}",
            report.unused_leaf_pointers.join(", ")
        );
    }

    Ok(report)
}

/// `/a/b` consumes `/a/b` and everything below it, but not `/a/bc`.
fn consumes(consumed: &str, leaf: &str) -> bool {
    match leaf.strip_prefix(consumed) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Every scalar leaf with its JSON pointer. A scalar document is the single
/// leaf `/`.
fn leaves(root: &Value) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    let mut stack = vec![(String::new(), root)];
    while let Some((ptr, v)) = stack.pop() {
        match v {
            Value::Object(map) => {
                for (k, child) in map {
                    let token = k.replace('~', "~0").replace('/', "~1");
                    stack.push((format!("{ptr}/{token}"), child));
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    stack.push((format!("{ptr}/{i}"), child));
                }
            }
            _ if ptr.is_empty() => out.push(("/".to_string(), v)),
            _ => out.push((ptr, v)),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view with defaults applied and values validated.
    pub fn monitor(&self) -> Result<MonitorConfig> {
        MonitorConfig::from_config_json(&self.config_json)
    }
}

/// Config paths from `FW_CONFIG` (comma separated), else the default path.
pub fn paths_from_env() -> Vec<String> {
    match std::env::var(ENV_CONFIG_PATHS) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![DEFAULT_CONFIG_PATH.to_string()],
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw = fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as an empty layer.
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        overlay(&mut merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; any other value in `layer` replaces `base`.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (k, v) in layer_map {
                overlay(base_map.entry(k).or_insert(Value::Null), v);
            }
        }
        (slot, v) => *slot = v,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json::Map is key-sorted (no preserve_order), so this is stable.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    match leaves(v)
        .into_iter()
        .find(|(_, leaf)| leaf.as_str().is_some_and(looks_like_secret))
    {
        Some((ptr, _)) => bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED"),
        None => Ok(()),
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
