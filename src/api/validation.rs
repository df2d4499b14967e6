use crate::api::errors::ApiError;
use crate::services::storage::file_extension;

/// Normalizes an allowed-type entry (`"PDF"`, `".pdf"`) to a bare extension.
pub(crate) fn normalize_extension(entry: &str) -> String {
    entry.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Checks an uploaded file against an activity's allowed types and size cap.
/// An empty `allowed` list falls back to `default_allowed`. Returns the
/// file's extension.
pub(crate) fn validate_submission_file(
    file_name: &str,
    size_bytes: u64,
    allowed: &[String],
    default_allowed: &[String],
    max_size_mb: u64,
) -> Result<String, ApiError> {
    let extension = file_extension(file_name)
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    let allowed = if allowed.is_empty() { default_allowed } else { allowed };
    if !allowed.iter().any(|entry| normalize_extension(entry) == extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    if size_bytes == 0 {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }
    if size_bytes > max_size_mb * 1024 * 1024 {
        return Err(ApiError::BadRequest(format!("File size exceeds {max_size_mb}MB limit")));
    }

    Ok(extension)
}
