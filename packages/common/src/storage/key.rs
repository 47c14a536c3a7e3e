use super::error::StorageError;

const MAX_PATH_LEN: usize = 512;

/// Checks if a path string contains path traversal patterns.
pub fn contains_path_traversal(path: &str) -> bool {
    path == ".."
        || path.starts_with("../")
        || path.contains("/../")
        || path.ends_with("/..")
        || path.starts_with("..\\")
        || path.contains("\\..\\")
        || path.ends_with("\\..")
}

/// Validates an object path before it reaches a storage backend.
///
/// Accepted paths are relative, `/`-separated, free of traversal and hidden
/// segments, and limited to `a-zA-Z0-9/_.-`.
pub fn validate_storage_path(path: &str) -> Result<&str, StorageError> {
    let invalid = |msg: &str| Err(StorageError::InvalidPath(msg.to_string()));

    if path.is_empty() {
        return invalid("path cannot be empty");
    }
    if path.len() > MAX_PATH_LEN {
        return invalid("path exceeds maximum length of 512 characters");
    }
    if path.contains('\0') {
        return invalid("path must not contain null bytes");
    }
    if path.contains('\\') {
        return invalid("path must not contain backslashes");
    }
    if path.starts_with('/') || path.ends_with('/') {
        return invalid("path must not start or end with '/'");
    }
    if contains_path_traversal(path) {
        return invalid("path must not contain '..' traversal");
    }

    for segment in path.split('/') {
        if segment.is_empty() {
            return invalid("path must not contain empty segments");
        }
        if segment.starts_with('.') {
            return invalid("path segments must not start with '.'");
        }
    }

    if !path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
    {
        return invalid("path contains invalid characters (allowed: a-zA-Z0-9, /, -, _, .)");
    }

    Ok(path)
}
