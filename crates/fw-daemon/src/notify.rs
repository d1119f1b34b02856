//! Operator alerts for missing files.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::info;

/// Subject and body of a missing-file alert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingFileAlert {
    pub subject: String,
    pub body: String,
}

impl MissingFileAlert {
    /// `timestamp` is echoed as given by the caller.
    pub fn compose(feed_type: &str, timestamp: &str) -> Self {
        let feed = feed_type.trim().to_uppercase();
        Self {
            subject: format!("Missing File: {feed} - {timestamp}"),
            body: format!("File {feed} for {timestamp} is missing! Please investigate."),
        }
    }
}

#[async_trait::async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send(&self, alert: &MissingFileAlert) -> Result<()>;
}

/// Posts `{"content": "<subject>\n<body>"}` to a chat webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL carries the credential.
        f.debug_struct("WebhookNotifier")
            .field("url", &"<REDACTED>")
            .finish()
    }
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

#[async_trait::async_trait]
impl AlertNotifier for WebhookNotifier {
    async fn send(&self, alert: &MissingFileAlert) -> Result<()> {
        let content = format!("**{}**\n{}", alert.subject, alert.body);
        let resp = self
            .http
            .post(&self.url)
            .json(&WebhookPayload { content: &content })
            .send()
            .await
            .context("alert webhook request failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("alert webhook http error status={}", status.as_u16()));
        }

        info!(subject = %alert.subject, "missing-file alert delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_uppercases_feed_and_keeps_timestamp() {
        let a = MissingFileAlert::compose("metar", "2024-01-01T05:00:00Z");
        assert_eq!(a.subject, "Missing File: METAR - 2024-01-01T05:00:00Z");
        assert_eq!(
            a.body,
            "File METAR for 2024-01-01T05:00:00Z is missing! Please investigate."
        );
    }
}
