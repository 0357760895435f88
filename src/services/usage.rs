use anyhow::Result;
use async_trait::async_trait;

/// Downstream disk-usage accounting hook, invoked after each successful
/// placement. Strictly best-effort: a failed notification is logged by the
/// caller and never invalidates the placement itself.
#[async_trait]
pub trait UsageNotifier: Send + Sync {
    async fn notify(&self) -> Result<()>;
}

/// Notifier for deployments without usage accounting
pub struct NoOpNotifier;

#[async_trait]
impl UsageNotifier for NoOpNotifier {
    async fn notify(&self) -> Result<()> {
        Ok(())
    }
}

/// Pings an HTTP endpoint so the accounting service recomputes usage.
/// The ping carries no body; the receiving side owns the numbers.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl UsageNotifier for WebhookNotifier {
    async fn notify(&self) -> Result<()> {
        let response = self.client.post(&self.url).send().await?;
        response.error_for_status()?;
        Ok(())
    }
}
