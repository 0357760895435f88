use crate::models::UploadMetadata;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Parses a raw transfer-protocol metadata header into placement metadata.
///
/// The wire format is comma-separated `key base64value` pairs, e.g.
/// `filename cmVwb3J0LnBkZg==,relativePath ZG9jcy9yZXBvcnQucGRm`.
/// Keys without a value, unknown keys, and values that fail to decode are
/// skipped rather than rejected; the finalizer validates what it needs.
pub fn parse_wire_metadata(raw: &str) -> UploadMetadata {
    let mut metadata = UploadMetadata::default();

    for pair in raw.split(',') {
        let mut parts = pair.trim().splitn(2, ' ');
        let (Some(key), Some(encoded)) = (parts.next(), parts.next()) else {
            continue;
        };

        let Ok(bytes) = STANDARD.decode(encoded.trim()) else {
            tracing::warn!("Skipping undecodable metadata value for key '{}'", key);
            continue;
        };
        let Ok(value) = String::from_utf8(bytes) else {
            tracing::warn!("Skipping non-UTF-8 metadata value for key '{}'", key);
            continue;
        };

        match key {
            "filename" => metadata.filename = Some(value),
            "relativePath" => metadata.relative_path = Some(value),
            "targetPath" => metadata.target_path = Some(value),
            "filetype" => metadata.filetype = Some(value),
            _ => {}
        }
    }

    metadata
}
