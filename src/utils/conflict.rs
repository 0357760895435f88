use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Picks a final destination for a placement candidate.
///
/// An unoccupied candidate is returned as-is. Otherwise a sortable UTC
/// timestamp is inserted between the stem and the extension, e.g.
/// `report_2024-01-01T00-00-00-000Z.pdf`. The alternative is used without
/// a second existence check; the millisecond stamp carries the retry.
pub async fn resolve_collision(candidate: PathBuf) -> PathBuf {
    // A failed probe counts as occupied: degrading to the timestamped
    // name is recoverable, overwriting an occupant is not
    let occupied = tokio::fs::try_exists(&candidate).await.unwrap_or(true);
    if !occupied {
        return candidate;
    }
    timestamped_alternative(&candidate, Utc::now())
}

fn timestamped_alternative(candidate: &Path, now: DateTime<Utc>) -> PathBuf {
    // ISO-8601 with `:` and `.` swapped for `-`, so the stamp is legal in filenames
    let stamp = now.format("%Y-%m-%dT%H-%M-%S-%3fZ");

    let stem = candidate
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");

    let name = match candidate.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{stamp}.{ext}"),
        None => format!("{stem}_{stamp}"),
    };

    candidate.with_file_name(name)
}
