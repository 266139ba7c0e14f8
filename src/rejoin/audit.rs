//! Audit webhook
//!
//! Audit lines are mirrored to an external webhook as `{"content": "..."}`.
//! Delivery is best-effort: each line is posted from a detached task, failures
//! are logged and never retried.

use crate::rejoin::WardenResult;
use serde::Serialize;
use tracing::{debug, error, info};

/// Destination for human-readable audit lines
#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    /// Queue a line for delivery without waiting on it
    fn record(&self, line: String);
}

/// Webhook request body
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub content: String,
}

/// Audit sink that posts to a webhook URL
#[derive(Debug, Clone)]
pub struct WebhookAudit {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookAudit {
    #[must_use]
    pub fn new(url: Option<String>) -> Self {
        if url.is_none() {
            info!("WEBHOOK_URL not set, audit lines will only be logged");
        }
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Post a single line and wait for the response
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the webhook answers with a
    /// non-success status.
    pub async fn post(&self, url: &str, line: String) -> WardenResult<()> {
        self.client
            .post(url)
            .json(&WebhookPayload { content: line })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl AuditSink for WebhookAudit {
    fn record(&self, line: String) {
        info!(target: crate::EVENT_TARGET, audit = %line, "Audit");

        let Some(url) = self.url.clone() else {
            return;
        };

        let webhook = self.clone();
        tokio::spawn(async move {
            match webhook.post(&url, line).await {
                Ok(()) => debug!("Audit line sent to webhook"),
                Err(e) => error!("Failed to send audit line to webhook: {e}"),
            }
        });
    }
}
