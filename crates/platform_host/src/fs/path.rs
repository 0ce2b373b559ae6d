//! Logical-path helpers shared across host abstractions.
//!
//! Logical paths are slash-delimited and relative to the granted storage root. Empty segments are
//! ignored so `"/notes//a.txt"` and `"notes/a.txt"` address the same entry.

use super::types::StorageError;

/// Splits a logical path into its non-empty segments.
///
/// # Errors
///
/// Returns [`StorageError::InvalidPath`] when a segment is `.` or `..`; traversal is not part of
/// the logical path model.
pub fn path_segments(path: &str) -> Result<Vec<&str>, StorageError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" => continue,
            "." | ".." => return Err(StorageError::invalid_path(path)),
            other => segments.push(other),
        }
    }
    Ok(segments)
}

/// Splits a logical path into its parent segments and leaf name.
///
/// # Errors
///
/// Returns [`StorageError::InvalidPath`] when the path has no leaf (for example `""` or `"/"`).
pub fn split_leaf(path: &str) -> Result<(Vec<&str>, &str), StorageError> {
    let mut segments = path_segments(path)?;
    let leaf = segments
        .pop()
        .ok_or_else(|| StorageError::invalid_path(path))?;
    Ok((segments, leaf))
}

/// Returns the canonical form of a logical path: segments joined by `/`, no leading slash.
///
/// The root is represented by the empty string.
///
/// # Errors
///
/// Returns [`StorageError::InvalidPath`] under the same rules as [`path_segments`].
pub fn normalize_storage_path(path: &str) -> Result<String, StorageError> {
    Ok(path_segments(path)?.join("/"))
}

/// Joins a directory path and a child name.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Returns the last segment of a logical path, or the input when it has no separator.
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Returns the directory part of a logical path (everything before the last `/`).
pub fn parent_path(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Validates a single entry name supplied by a user action (create/rename).
///
/// # Errors
///
/// Returns [`StorageError::InvalidPath`] for empty names, names containing `/`, and `.`/`..`.
pub fn validate_entry_name(name: &str) -> Result<&str, StorageError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains('/') || trimmed == "." || trimmed == ".." {
        return Err(StorageError::invalid_path(name));
    }
    Ok(trimmed)
}
