//! Lead capture webhook notification.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::flow::ContactInfo;

/// Best-effort notification fired when a lead is captured. Failures are
/// logged by callers and never block flow progression.
#[async_trait]
pub trait LeadNotifier: Send + Sync {
    async fn notify(&self, contact: &ContactInfo) -> Result<()>;
}

/// Posts captured leads to an external webhook.
pub struct WebhookLeadNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookLeadNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl LeadNotifier for WebhookLeadNotifier {
    async fn notify(&self, contact: &ContactInfo) -> Result<()> {
        if self.url.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "name": contact.name,
                "email": contact.email,
                "receiver_number": contact.phone,
            }))
            .send()
            .await
            .context("Failed to reach lead webhook")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Lead webhook failed ({})", status));
        }
        Ok(())
    }
}
