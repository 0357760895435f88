use crate::config::FinalizerConfig;
use crate::services::usage::{NoOpNotifier, UsageNotifier, WebhookNotifier};
use std::sync::Arc;
use tracing::info;

/// Selects the disk-usage notifier implementation from config.
pub fn setup_notifier(config: &FinalizerConfig) -> Arc<dyn UsageNotifier> {
    match &config.usage_webhook_url {
        Some(url) => {
            info!("🔔 Disk usage notifications -> {}", url);
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            info!("🔕 Disk usage notifications disabled (no webhook configured)");
            Arc::new(NoOpNotifier)
        }
    }
}
