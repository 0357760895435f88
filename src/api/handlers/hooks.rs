use crate::AppState;
use crate::models::{CompletedUpload, UploadMetadata};
use crate::utils::wire;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

/// Completion callback payload from the upload-protocol service.
///
/// Metadata arrives either structured (`metadata`) or as the protocol's
/// raw header of base64 pairs (`uploadMetadata`); the structured form wins
/// when both are present.
#[derive(Deserialize, ToSchema)]
pub struct UploadCompleteRequest {
    pub id: String,

    /// Declared total size in bytes; 0 signals directory intent
    #[serde(default)]
    pub size: i64,

    #[serde(default)]
    pub metadata: Option<UploadMetadata>,

    #[serde(default, rename = "uploadMetadata")]
    pub upload_metadata: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UploadCompleteResponse {
    /// False when the id is already being finalized (duplicate delivery)
    pub accepted: bool,
}

#[utoipa::path(
    post,
    path = "/hooks/upload-complete",
    request_body = UploadCompleteRequest,
    responses(
        (status = 202, description = "Completion signal received", body = UploadCompleteResponse)
    ),
    tag = "hooks"
)]
pub async fn upload_complete(
    State(state): State<AppState>,
    Json(req): Json<UploadCompleteRequest>,
) -> (StatusCode, Json<UploadCompleteResponse>) {
    info!("📥 Completion signal for upload {} ({} bytes)", req.id, req.size);

    let metadata = match req.metadata {
        Some(metadata) => metadata,
        None => req
            .upload_metadata
            .as_deref()
            .map(wire::parse_wire_metadata)
            .unwrap_or_default(),
    };

    let accepted = state
        .finalizer
        .dispatch(CompletedUpload {
            id: req.id,
            size: req.size,
            metadata,
        })
        .is_some();

    // The signal is acknowledged either way; outcomes surface via logs only
    (
        StatusCode::ACCEPTED,
        Json(UploadCompleteResponse { accepted }),
    )
}
