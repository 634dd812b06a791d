use std::fs;
use std::io;
use std::path::Path;

use crate::error::{AppError, Result};

/// Characters that may never appear in a folder name on any supported platform.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\0'];

/// Additional characters Windows rejects in file names.
#[cfg(windows)]
const WINDOWS_FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Create a new directory at the given path. Parents must already exist.
pub fn create_dir(path: &Path) -> io::Result<()> {
    fs::create_dir(path)
}

/// Validate a user-supplied folder name and return it trimmed.
///
/// The name must denote exactly one new path segment below the current directory.
pub fn validate_folder_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidFolderName(
            "name must not be empty".to_string(),
        ));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(AppError::InvalidFolderName(trimmed.to_string()));
    }
    if trimmed.contains(FORBIDDEN_CHARS) {
        return Err(AppError::InvalidFolderName(trimmed.to_string()));
    }
    #[cfg(windows)]
    if trimmed.contains(WINDOWS_FORBIDDEN_CHARS) {
        return Err(AppError::InvalidFolderName(trimmed.to_string()));
    }
    Ok(trimmed)
}
