use crate::config::FinalizerConfig;
use anyhow::{Context, Result};
use tracing::info;

/// Ensures the staging directory and the final store root exist before
/// anything gets dispatched.
pub async fn setup_directories(config: &FinalizerConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.staging_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create staging directory {}",
                config.staging_dir.display()
            )
        })?;
    info!("📦 Staging directory ready: {}", config.staging_dir.display());

    tokio::fs::create_dir_all(&config.storage_root)
        .await
        .with_context(|| {
            format!(
                "failed to create storage root {}",
                config.storage_root.display()
            )
        })?;
    info!("🗂️  Final store root ready: {}", config.storage_root.display());

    Ok(())
}
