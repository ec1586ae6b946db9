//! Path validation helper functions for the directory layer.

use tessera_constants::directory::MAX_DIRECTORY_DEPTH;
use tessera_constants::directory::MAX_PATH_SEGMENT_LENGTH_BYTES;

use super::DirectoryError;

/// Validate a non-root directory path and take ownership of its segments.
pub(super) fn validate_path<S: AsRef<str>>(path: &[S]) -> Result<Vec<String>, DirectoryError> {
    if path.is_empty() {
        return Err(DirectoryError::InvalidPath {
            segment: String::new(),
            reason: "the root directory cannot be opened, created or removed".to_string(),
        });
    }
    validate_path_allow_empty(path)
}

/// Validate a directory path, allowing the root for list, exists and move checks.
pub(super) fn validate_path_allow_empty<S: AsRef<str>>(path: &[S]) -> Result<Vec<String>, DirectoryError> {
    if path.len() as u32 > MAX_DIRECTORY_DEPTH {
        return Err(DirectoryError::PathTooDeep {
            depth: path.len() as u32,
            max: MAX_DIRECTORY_DEPTH,
        });
    }

    let mut owned = Vec::with_capacity(path.len());
    for segment in path {
        let segment = segment.as_ref();
        if segment.is_empty() {
            return Err(DirectoryError::InvalidPath {
                segment: String::new(),
                reason: "path segment cannot be empty".to_string(),
            });
        }

        if segment.len() as u32 > MAX_PATH_SEGMENT_LENGTH_BYTES {
            return Err(DirectoryError::InvalidPath {
                segment: segment.to_string(),
                reason: format!("segment length {} exceeds maximum {}", segment.len(), MAX_PATH_SEGMENT_LENGTH_BYTES),
            });
        }
        owned.push(segment.to_string());
    }

    Ok(owned)
}

/// `/a/b` rendering used in log fields and error reasons.
pub(super) fn display_path(path: &[String]) -> String {
    format!("/{}", path.join("/"))
}
