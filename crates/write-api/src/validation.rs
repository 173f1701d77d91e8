use crate::ApiError;

/// Validates a single folder name typed by the user.
///
/// Rejects:
/// - Empty or whitespace-only names
/// - Names containing a path separator (`/`)
pub fn validate_folder_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::InvalidFolderName(name.to_string()));
    }
    if name.contains('/') {
        return Err(ApiError::InvalidFolderName(name.to_string()));
    }
    Ok(())
}
