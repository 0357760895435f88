use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Malformed percent-encoding in a client-supplied relative path.
///
/// The staging entry is deliberately left untouched when this fires:
/// deleting the blob on a decode failure would silently lose the upload.
#[derive(Debug, thiserror::Error)]
#[error("malformed percent-encoding in relative path '{raw}'")]
pub struct DecodeError {
    pub raw: String,
}

/// Resolved placement for a file upload: the directory to materialize and
/// the leaf name inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub dir: PathBuf,
    pub leaf: String,
}

/// Percent-decodes a client-supplied relative path.
pub fn decode_relative_path(raw: &str) -> Result<String, DecodeError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| DecodeError { raw: raw.to_string() })
}

/// Replaces characters that are illegal on common filesystems with `_`.
/// Control characters get the same treatment.
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Normalizes a client-supplied path fragment into root-safe relative
/// components: separators unified, `.` and empty segments dropped, `..`
/// popping clamped so the result can never climb out of whatever it is
/// joined onto, and each remaining segment sanitized.
fn clean_relative(raw: &str) -> PathBuf {
    let normalized = raw.replace('\\', "/");
    let mut parts: Vec<String> = Vec::new();

    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    tracing::warn!("Path traversal attempt clamped at storage root: {}", raw);
                }
            }
            other => parts.push(sanitize_segment(other)),
        }
    }

    parts.iter().collect()
}

/// Resolves the final directory for a directory-intent upload.
pub fn resolve_directory(storage_root: &Path, target_path: &str, relative_path: &str) -> PathBuf {
    storage_root
        .join(clean_relative(target_path))
        .join(clean_relative(relative_path))
}

/// Resolves the final directory and leaf name for a file upload.
///
/// `relative_path` must already be percent-decoded; the leaf is its last
/// path segment. The result is always a descendant of `storage_root`.
pub fn resolve_file(storage_root: &Path, target_path: &str, relative_path: &str) -> ResolvedTarget {
    let normalized = relative_path.replace('\\', "/");
    let trimmed = normalized.trim_end_matches('/');

    let (dir_part, leaf_part) = match trimmed.rsplit_once('/') {
        Some((dir, leaf)) => (dir, leaf),
        None => ("", trimmed),
    };

    let mut leaf = sanitize_segment(leaf_part);
    if leaf.is_empty() || leaf == ".." || leaf == "." {
        leaf = "_".to_string();
    }

    let dir = storage_root
        .join(clean_relative(target_path))
        .join(clean_relative(dir_part));
    debug_assert!(dir.starts_with(storage_root));

    ResolvedTarget { dir, leaf }
}
