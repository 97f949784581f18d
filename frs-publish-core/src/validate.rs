//! Naming and size rules the release service imposes on uploaded files.
//!
//! These run eagerly whenever a file is attached to the model, so an invalid
//! file never reaches the synchronisation engine.

use std::fs::File;
use std::path::Path;

use crate::error::{NamingViolation, ValidationError};

/// Smallest accepted change log / release notes file, in bytes.
pub const MIN_RELEASE_ARTIFACT_LEN: u64 = 20;
/// Largest accepted change log / release notes file, in bytes.
pub const MAX_RELEASE_ARTIFACT_LEN: u64 = 256_000;

const FORBIDDEN_CHARS: [char; 4] = [' ', '~', '(', ')'];

/// Checks that `path` exists, is readable and has a base name free of spaces,
/// tildes and parentheses.
pub fn validate_file_naming(path: &Path) -> Result<(), ValidationError> {
    let fail = |violation| ValidationError::Naming {
        path: path.to_path_buf(),
        violation,
    };

    let metadata = std::fs::metadata(path).map_err(|_| fail(NamingViolation::Missing))?;
    if !metadata.is_file() || File::open(path).is_err() {
        return Err(fail(NamingViolation::Unreadable));
    }

    let name = base_name(path).ok_or_else(|| fail(NamingViolation::EmptyBaseName))?;
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(fail(NamingViolation::ForbiddenCharacter(c)));
    }
    Ok(())
}

/// Checks that a change log or release notes file is between
/// [`MIN_RELEASE_ARTIFACT_LEN`] and [`MAX_RELEASE_ARTIFACT_LEN`] bytes, inclusive.
pub fn validate_release_artifact_size(path: &Path) -> Result<(), ValidationError> {
    let len = std::fs::metadata(path)
        .map_err(|_| ValidationError::Naming {
            path: path.to_path_buf(),
            violation: NamingViolation::Missing,
        })?
        .len();
    if !(MIN_RELEASE_ARTIFACT_LEN..=MAX_RELEASE_ARTIFACT_LEN).contains(&len) {
        return Err(ValidationError::Size {
            path: path.to_path_buf(),
            len,
            min: MIN_RELEASE_ARTIFACT_LEN,
            max: MAX_RELEASE_ARTIFACT_LEN,
        });
    }
    Ok(())
}

/// Both rules, as applied to change logs and release notes.
pub fn validate_release_artifact(path: &Path) -> Result<(), ValidationError> {
    validate_file_naming(path)?;
    validate_release_artifact_size(path)
}

/// The final path component as UTF-8, if it is non-empty.
pub fn base_name(path: &Path) -> Option<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
}
