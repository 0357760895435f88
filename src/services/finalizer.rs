use crate::config::FinalizerConfig;
use crate::models::CompletedUpload;
use crate::services::usage::UsageNotifier;
use crate::utils::conflict;
use crate::utils::paths::{self, DecodeError};
use crate::utils::registry::ProcessingRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Everything that can go wrong while finalizing a single upload.
///
/// All of these are local to one upload id: a failing finalization leaves
/// its own staging entry behind (for a later sweep or manual recovery) and
/// never affects other ids.
#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("missing filename in metadata for upload {id}")]
    MissingMetadata { id: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("size mismatch after copy: source={expected} bytes, target={actual} bytes")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("all move strategies exhausted for {from} -> {to}")]
    MoveExhausted { from: PathBuf, to: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What a finalization did with the staged entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Directory intent: the folder exists and the placeholder is gone
    DirectoryCreated(PathBuf),
    /// The staged blob was moved into the final tree at this path
    FilePlaced(PathBuf),
    /// Nothing staged under this id anymore; an earlier run finished the job
    SourceMissing,
}

/// One tier of the move fallback chain, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStrategy {
    /// Atomic rename; only works within one volume
    Rename,
    /// In-process copy, then verify size before deleting the source
    Copy,
    /// External copy utility for volumes the in-process copy cannot handle
    ExternalCopy,
}

impl MoveStrategy {
    pub fn default_chain() -> Vec<MoveStrategy> {
        vec![
            MoveStrategy::Rename,
            MoveStrategy::Copy,
            MoveStrategy::ExternalCopy,
        ]
    }
}

/// Turns completed staging entries into placed artifacts in the final store.
///
/// Owns both the dispatch side (dedup via the processing registry, spawning)
/// and the placement side (path resolution, directory materialization, the
/// move fallback chain, sidecar cleanup, usage notification).
pub struct FinalizerService {
    config: FinalizerConfig,
    registry: ProcessingRegistry,
    notifier: Arc<dyn UsageNotifier>,
    move_strategies: Vec<MoveStrategy>,
}

impl FinalizerService {
    pub fn new(config: FinalizerConfig, notifier: Arc<dyn UsageNotifier>) -> Self {
        Self {
            config,
            registry: ProcessingRegistry::new(),
            notifier,
            move_strategies: MoveStrategy::default_chain(),
        }
    }

    /// Replaces the move fallback chain; used to exercise the degraded tiers
    pub fn with_move_strategies(mut self, strategies: Vec<MoveStrategy>) -> Self {
        self.move_strategies = strategies;
        self
    }

    pub fn registry(&self) -> &ProcessingRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FinalizerConfig {
        &self.config
    }

    /// Entry point for completion signals, live and replayed alike.
    ///
    /// A signal for an id that is already being finalized collapses to a
    /// logged no-op. Otherwise the id is claimed and the work runs on a
    /// spawned task so the signalling side is never blocked; the registry
    /// claim is released whenever that task ends, however it ends.
    ///
    /// The returned handle lets tests and one-shot tooling await the task;
    /// regular callers drop it and watch the logs.
    pub fn dispatch(self: &Arc<Self>, upload: CompletedUpload) -> Option<JoinHandle<()>> {
        let Some(guard) = self.registry.try_claim(&upload.id) else {
            warn!(
                "Upload {} is already being finalized, skipping duplicate signal",
                upload.id
            );
            return None;
        };

        info!("Starting finalization of upload {}", upload.id);
        let service = self.clone();

        Some(tokio::spawn(async move {
            // Keep the claim alive for the whole task; dropping it on any
            // exit path is what makes duplicate signals safe.
            let _guard = guard;
            let started = std::time::Instant::now();

            match service.finalize(&upload).await {
                Ok(outcome) => info!(
                    "✅ Upload {} finalized in {:?}: {:?}",
                    upload.id,
                    started.elapsed(),
                    outcome
                ),
                Err(e) => error!("❌ Finalization failed for upload {}: {}", upload.id, e),
            }
        }))
    }

    /// Runs the placement pipeline for one completed upload.
    pub async fn finalize(
        &self,
        upload: &CompletedUpload,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let filename =
            upload
                .metadata
                .filename
                .as_deref()
                .ok_or_else(|| FinalizeError::MissingMetadata {
                    id: upload.id.clone(),
                })?;

        let relative_path = match upload.metadata.relative_path.as_deref() {
            Some(raw) => paths::decode_relative_path(raw)?,
            None => filename.to_string(),
        };
        let target_path = upload.metadata.target_path.as_deref().unwrap_or("");

        let source = self.config.blob_path(&upload.id);
        if !fs::try_exists(&source).await? {
            warn!(
                "No staged blob for upload {}, nothing left to finalize",
                upload.id
            );
            return Ok(FinalizeOutcome::SourceMissing);
        }

        if upload.size == 0 {
            // Declared size 0 is the directory-intent convention. A genuine
            // zero-byte file can therefore never arrive as a file.
            self.place_directory(&upload.id, target_path, &relative_path, &source)
                .await
        } else {
            self.place_file(&upload.id, target_path, &relative_path, &source)
                .await
        }
    }

    /// Materializes an empty directory; the staged blob is only a placeholder.
    async fn place_directory(
        &self,
        id: &str,
        target_path: &str,
        relative_path: &str,
        source: &Path,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let dir = paths::resolve_directory(&self.config.storage_root, target_path, relative_path);

        // create_dir_all makes this naturally idempotent; no conflict handling
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| FinalizeError::DirectoryCreate {
                path: dir.clone(),
                source: e,
            })?;
        info!("📁 Created directory {} for upload {}", dir.display(), id);

        fs::remove_file(source).await?;
        self.remove_sidecar(id).await;

        Ok(FinalizeOutcome::DirectoryCreated(dir))
    }

    /// Moves the staged blob to its final path, resolving name collisions.
    async fn place_file(
        &self,
        id: &str,
        target_path: &str,
        relative_path: &str,
        source: &Path,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let target = paths::resolve_file(&self.config.storage_root, target_path, relative_path);

        fs::create_dir_all(&target.dir)
            .await
            .map_err(|e| FinalizeError::DirectoryCreate {
                path: target.dir.clone(),
                source: e,
            })?;

        let candidate = target.dir.join(&target.leaf);
        let dest = conflict::resolve_collision(candidate.clone()).await;
        if dest != candidate {
            warn!(
                "Destination {} already exists, saving upload {} as {}",
                candidate.display(),
                id,
                dest.display()
            );
        }

        self.move_into_place(source, &dest).await?;
        info!("📄 Placed upload {} at {}", id, dest.display());

        self.remove_sidecar(id).await;
        self.notify_usage();

        Ok(FinalizeOutcome::FilePlaced(dest))
    }

    /// Tries each configured move strategy in order until one lands the blob.
    ///
    /// A size mismatch aborts the whole chain: the bytes reached the target
    /// truncated, and re-copying over a bad destination is not a recovery a
    /// later tier can promise. The source is retained in that case.
    async fn move_into_place(&self, source: &Path, dest: &Path) -> Result<(), FinalizeError> {
        for strategy in &self.move_strategies {
            match self.attempt_move(*strategy, source, dest).await {
                Ok(()) => {
                    debug!("Moved {} via {:?}", dest.display(), strategy);
                    return Ok(());
                }
                Err(e @ FinalizeError::SizeMismatch { .. }) => return Err(e),
                Err(e) => warn!(
                    "{:?} move of {} -> {} failed ({}), trying next strategy",
                    strategy,
                    source.display(),
                    dest.display(),
                    e
                ),
            }
        }

        Err(FinalizeError::MoveExhausted {
            from: source.to_path_buf(),
            to: dest.to_path_buf(),
        })
    }

    async fn attempt_move(
        &self,
        strategy: MoveStrategy,
        source: &Path,
        dest: &Path,
    ) -> Result<(), FinalizeError> {
        match strategy {
            MoveStrategy::Rename => Ok(fs::rename(source, dest).await?),

            MoveStrategy::Copy => {
                fs::copy(source, dest).await?;
                self.verify_and_remove_source(source, dest).await
            }

            MoveStrategy::ExternalCopy => {
                let status = tokio::process::Command::new(&self.config.copy_command)
                    .arg("-a")
                    .arg(source)
                    .arg(dest)
                    .status()
                    .await?;
                if !status.success() {
                    return Err(FinalizeError::Io(std::io::Error::other(format!(
                        "{} exited with {}",
                        self.config.copy_command, status
                    ))));
                }
                self.verify_and_remove_source(source, dest).await
            }
        }
    }

    /// Shared post-condition of the copy tiers: the source is only deleted
    /// once the destination holds the full byte count.
    async fn verify_and_remove_source(
        &self,
        source: &Path,
        dest: &Path,
    ) -> Result<(), FinalizeError> {
        let expected = fs::metadata(source).await?.len();
        let actual = fs::metadata(dest).await?.len();

        if expected != actual {
            return Err(FinalizeError::SizeMismatch { expected, actual });
        }

        fs::remove_file(source).await?;
        debug!("Verified {} bytes at {}, source removed", actual, dest.display());
        Ok(())
    }

    /// Removes the metadata sidecar; an already-missing sidecar is fine.
    async fn remove_sidecar(&self, id: &str) {
        let sidecar = self.config.sidecar_path(id);
        match fs::remove_file(&sidecar).await {
            Ok(()) => debug!("Removed sidecar {}", sidecar.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove sidecar {}: {}", sidecar.display(), e),
        }
    }

    /// Fire-and-forget ping to the disk-usage collaborator.
    fn notify_usage(&self) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify().await {
                warn!("Disk usage notification failed: {}", e);
            }
        });
    }
}
