use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Client-supplied placement metadata carried in an upload's sidecar.
///
/// Only `filename` is required; everything else degrades to a default.
/// `relative_path` is percent-encoded by the client and preserves the
/// folder structure of a dropped directory tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UploadMetadata {
    pub filename: Option<String>,

    #[serde(rename = "relativePath", skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,

    /// Base destination directory below the storage root; empty means the root itself
    #[serde(rename = "targetPath", skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filetype: Option<String>,
}

/// On-disk metadata sidecar written by the upload protocol next to each
/// staged blob: blob at `<staging>/<id>`, sidecar at `<staging>/<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub id: String,

    /// Declared total size in bytes; 0 marks directory intent, not an empty file
    pub size: i64,

    /// Bytes received so far; absent once the transfer store considers the upload done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    #[serde(default)]
    pub metadata: UploadMetadata,
}

impl Sidecar {
    /// Whether the recorded transfer state counts as finished.
    ///
    /// Zero declared size is a directory placeholder and is always ready;
    /// a missing offset means the transfer store stopped tracking it, which
    /// only happens after the last chunk landed.
    pub fn is_complete(&self) -> bool {
        self.size == 0 || self.offset.map_or(true, |offset| offset == self.size)
    }
}

/// A completed transfer, as reported by the upload protocol's completion
/// hook or replayed from staging by the recovery scanner.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    pub id: String,
    pub size: i64,
    pub metadata: UploadMetadata,
}

impl From<Sidecar> for CompletedUpload {
    fn from(sidecar: Sidecar) -> Self {
        Self {
            id: sidecar.id,
            size: sidecar.size,
            metadata: sidecar.metadata,
        }
    }
}
