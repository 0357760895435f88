use std::env;
use std::path::PathBuf;

/// Runtime configuration for the finalization engine
#[derive(Debug, Clone)]
pub struct FinalizerConfig {
    /// Flat staging directory the upload protocol writes blobs and sidecars into
    pub staging_dir: PathBuf,

    /// Root of the hierarchical final store; every placement lands below it
    pub storage_root: PathBuf,

    /// Seconds to wait after startup before the recovery sweep runs,
    /// so collaborators get a chance to finish initializing (default: 2)
    pub scan_startup_delay_secs: u64,

    /// Webhook pinged after each successful placement (disk-usage accounting)
    pub usage_webhook_url: Option<String>,

    /// External copy utility used as the last-resort move strategy (default: "cp")
    pub copy_command: String,
}

impl Default for FinalizerConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("tus-storage"),
            storage_root: PathBuf::from("share-folder"),
            scan_startup_delay_secs: 2,
            usage_webhook_url: None,
            copy_command: "cp".to_string(),
        }
    }
}

impl FinalizerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            storage_root: env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.storage_root),

            scan_startup_delay_secs: env::var("SCAN_STARTUP_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.scan_startup_delay_secs),

            usage_webhook_url: env::var("DISK_USAGE_WEBHOOK").ok(),

            copy_command: env::var("COPY_COMMAND").unwrap_or(default.copy_command),
        }
    }

    /// Create config for development and tests (no startup delay)
    pub fn development() -> Self {
        Self {
            scan_startup_delay_secs: 0,
            ..Self::default()
        }
    }

    /// Path of the staged data blob for an upload id
    pub fn blob_path(&self, id: &str) -> PathBuf {
        self.staging_dir.join(id)
    }

    /// Path of the metadata sidecar for an upload id
    pub fn sidecar_path(&self, id: &str) -> PathBuf {
        self.staging_dir.join(format!("{id}.json"))
    }
}
