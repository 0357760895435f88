use crate::config::FinalizerConfig;
use crate::models::Sidecar;
use crate::services::finalizer::FinalizerService;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, warn};

/// Summary of one staging-directory sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Entries handed to the dispatcher (complete uploads and directory intents)
    pub dispatched: usize,
    /// Entries still mid-transfer, left for the live completion path
    pub incomplete: usize,
    /// Sidecars without a matching blob, left in place for manual audit
    pub orphaned: usize,
}

/// Replays finished staging entries after a restart.
///
/// Runs once at startup. Everything it finds goes through the same
/// dispatcher as live completion signals, so placement has exactly one
/// implementation and duplicate replays collapse in the registry.
pub struct RecoveryScanner {
    config: FinalizerConfig,
    finalizer: Arc<FinalizerService>,
}

impl RecoveryScanner {
    pub fn new(config: FinalizerConfig, finalizer: Arc<FinalizerService>) -> Self {
        Self { config, finalizer }
    }

    /// Startup entry point: waits for collaborators, then sweeps once.
    pub async fn run(self) {
        tokio::time::sleep(Duration::from_secs(self.config.scan_startup_delay_secs)).await;

        info!(
            "🔎 Sweeping staging directory {} for recoverable uploads",
            self.config.staging_dir.display()
        );
        match self.scan().await {
            Ok(report) => info!(
                "Startup sweep finished: {} dispatched, {} incomplete, {} orphaned",
                report.dispatched, report.incomplete, report.orphaned
            ),
            Err(e) => error!("Startup sweep failed: {:#}", e),
        }
    }

    /// Sweeps the staging directory once.
    ///
    /// Per-entry problems (unreadable or unparsable sidecars) are logged and
    /// skipped; one broken entry never aborts the rest of the sweep.
    pub async fn scan(&self) -> anyhow::Result<ScanReport> {
        let mut report = ScanReport::default();
        let mut blobs: HashSet<String> = HashSet::new();
        let mut sidecars: Vec<String> = Vec::new();

        let mut entries = fs::read_dir(&self.config.staging_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            match name.strip_suffix(".json") {
                Some(id) => sidecars.push(id.to_string()),
                None => {
                    blobs.insert(name);
                }
            }
        }
        debug!(
            "Staging holds {} sidecars and {} blobs",
            sidecars.len(),
            blobs.len()
        );

        for id in sidecars {
            if !blobs.contains(&id) {
                warn!(
                    "⚠️  Orphaned sidecar without blob: {} (left for manual audit)",
                    self.config.sidecar_path(&id).display()
                );
                report.orphaned += 1;
                continue;
            }

            let sidecar_path = self.config.sidecar_path(&id);
            let sidecar: Sidecar = match fs::read(&sidecar_path).await {
                Ok(raw) => match serde_json::from_slice(&raw) {
                    Ok(sidecar) => sidecar,
                    Err(e) => {
                        error!("Unparsable sidecar {}: {}", sidecar_path.display(), e);
                        continue;
                    }
                },
                Err(e) => {
                    error!("Unreadable sidecar {}: {}", sidecar_path.display(), e);
                    continue;
                }
            };

            if !sidecar.is_complete() {
                debug!(
                    "Skipping incomplete upload {} ({}/{} bytes)",
                    id,
                    sidecar.offset.unwrap_or(0),
                    sidecar.size
                );
                report.incomplete += 1;
                continue;
            }

            if self.finalizer.dispatch(sidecar.into()).is_some() {
                report.dispatched += 1;
            }
        }

        Ok(report)
    }
}
