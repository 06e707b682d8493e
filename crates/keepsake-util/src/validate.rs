//! Validation of user-supplied project names and version descriptions.
//!
//! Validation runs before any mutation; a failure here carries a message
//! meant to be shown to the user verbatim.

use thiserror::Error;

/// Characters that cannot appear in a project name because the name becomes
/// a directory on every supported filesystem.
pub const RESERVED_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum project name length, in characters.
pub const MAX_NAME_CHARS: usize = 50;

/// Maximum version description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// A rejected name or description, with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The user-facing message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Validate a project name: non-empty, at most 50 characters, no reserved
/// filesystem characters.
pub fn project_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::new("Please enter a project name."));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::new(format!(
            "Project names are limited to {MAX_NAME_CHARS} characters."
        )));
    }
    if let Some(c) = name.chars().find(|c| RESERVED_NAME_CHARS.contains(c)) {
        return Err(ValidationError::new(format!(
            "Project names cannot contain '{c}'."
        )));
    }

    Ok(())
}

/// Validate a version description: non-empty, at most 200 characters.
pub fn version_description(description: &str) -> Result<(), ValidationError> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::new("Please enter a version description."));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::new(format!(
            "Version descriptions are limited to {MAX_DESCRIPTION_CHARS} characters."
        )));
    }

    Ok(())
}
