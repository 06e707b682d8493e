//! Engine error types.

use keepsake_storage::StorageError;
use keepsake_util::ValidationError;
use thiserror::Error;

/// Result type for project operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Errors that can occur during project operations.
///
/// Unknown version numbers are an expected case and are signaled through
/// boolean or empty-map returns, not through this enum.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// A user-supplied name or description was rejected. Recoverable by
    /// re-prompting; the message is meant to be shown verbatim.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The operation requires an active version but the project has none
    /// yet. Recoverable by creating a version first.
    #[error("{0}")]
    State(String),

    /// A project with this name already exists and is not empty.
    #[error("Project '{0}' already exists and is not empty")]
    AlreadyExists(String),

    /// A relative file path tried to escape the project directory.
    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    /// The persisted document was written by a newer build.
    #[error("Project document uses schema {found}; this build reads up to {supported}")]
    Schema { found: u32, supported: u32 },

    /// Document load/save failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Filesystem failure outside the probe layer (copy, create, delete).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProjectError {
    /// Create a state error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_error_state_displays_message() {
        let err = ProjectError::state("create a version first");
        assert_eq!(err.to_string(), "create a version first");
    }

    #[test]
    fn project_error_schema_names_versions() {
        let err = ProjectError::Schema {
            found: 9,
            supported: 1,
        };
        assert!(err.to_string().contains("schema 9"));
    }

    #[test]
    fn project_error_from_validation() {
        let err: ProjectError = keepsake_util::validate::project_name("").unwrap_err().into();
        assert!(matches!(err, ProjectError::Validation(_)));
    }
}
