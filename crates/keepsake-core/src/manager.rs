//! Project construction and discovery.
//!
//! `ProjectManager` is a thin factory over [`Project`]: it owns the shared
//! root path-resolution policy and nothing else.

use crate::error::ProjectResult;
use crate::models::ProjectSettings;
use crate::project::{Project, METADATA_FILE};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Creates and loads projects under one workspace directory.
#[derive(Debug, Clone)]
pub struct ProjectManager {
    workspace_dir: PathBuf,
}

impl ProjectManager {
    /// Create a manager rooted at an explicit workspace directory.
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
        }
    }

    /// Create a manager rooted at the platform default projects directory.
    ///
    /// Returns `None` when the platform reports no data directory.
    pub fn with_default_workspace() -> Option<Self> {
        keepsake_util::path::projects_dir().map(Self::new)
    }

    /// The workspace directory projects live under.
    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// Resolve the root directory a project name maps to.
    pub fn project_root(&self, name: &str) -> PathBuf {
        self.workspace_dir.join(name.trim())
    }

    /// Create a new project in the workspace.
    pub fn create_project(
        &self,
        name: &str,
        initial_files: Option<&[PathBuf]>,
        settings: Option<ProjectSettings>,
    ) -> ProjectResult<Project> {
        Project::create(self.project_root(name), name, initial_files, settings)
    }

    /// Load an existing project from its root directory.
    pub fn load_project(&self, root: impl Into<PathBuf>) -> ProjectResult<Project> {
        Project::load(root)
    }

    /// List project roots in the workspace: directories that contain a
    /// project document. Unreadable entries are skipped.
    pub fn list_projects(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.workspace_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(workspace = %self.workspace_dir.display(), error = %e, "Cannot list workspace");
                return Vec::new();
            }
        };

        let mut roots: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && path.join(METADATA_FILE).exists())
            .collect();
        roots.sort();
        roots
    }
}
