//! Path utilities.
//!
//! Resolution of the keepsake data directories plus traversal-safe path
//! arithmetic used when joining user-controlled relative paths onto a
//! project root.

use std::path::{Component, Path, PathBuf};

/// Get the directory that holds keepsake projects by default.
///
/// This follows platform conventions via `dirs`:
/// - `$XDG_DATA_HOME/keepsake/projects` on Linux
/// - `~/Library/Application Support/keepsake/projects` on macOS
pub fn projects_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("keepsake").join("projects"))
}

/// Get the keepsake logs directory.
pub fn logs_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("keepsake").join("logs"))
}

/// Check if a path is within a base directory.
///
/// Used as a security check to prevent path traversal.
pub fn is_within(path: &Path, base: &Path) -> bool {
    let canonical_path = path.canonicalize().ok();
    let canonical_base = base.canonicalize().ok();

    match (canonical_path, canonical_base) {
        (Some(p), Some(b)) => p.starts_with(&b),
        // If either side cannot be canonicalized (e.g. the path does not
        // exist yet), fall back to a lexical prefix check.
        _ => path.starts_with(base),
    }
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this does not require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => result.push(component),
        }
    }

    result
}

/// Make a path relative to a base directory.
///
/// Returns `None` if the path is not within the base directory.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Join a relative path onto a base, preventing path traversal.
///
/// Returns `None` if the resulting path would escape the base.
pub fn safe_join(base: &Path, path: &Path) -> Option<PathBuf> {
    let normalized = normalize(&base.join(path));

    if is_within(&normalized, base) {
        Some(normalized)
    } else {
        None
    }
}

/// Render a relative path in portable form: forward slashes only.
///
/// Snapshot file lists and hash maps are keyed by this form so documents
/// written on Windows and Unix agree.
pub fn to_portable(path: &Path) -> String {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projects_dir() {
        let dir = projects_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("keepsake/projects"));
    }

    #[test]
    fn test_normalize() {
        let path = Path::new("/home/user/./work/../work/notes");
        assert_eq!(normalize(path), PathBuf::from("/home/user/work/notes"));
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/data/projects/demo");
        let path = Path::new("/data/projects/demo/docs/readme.txt");
        assert_eq!(
            relative_to(path, base),
            Some(PathBuf::from("docs/readme.txt"))
        );
        assert_eq!(relative_to(Path::new("/other"), base), None);
    }

    #[test]
    fn test_safe_join() {
        let base = PathBuf::from("/data/projects/demo");

        let ok = safe_join(&base, Path::new("docs/readme.txt"));
        assert_eq!(ok, Some(PathBuf::from("/data/projects/demo/docs/readme.txt")));

        let escape = safe_join(&base, Path::new("../../../etc/passwd"));
        assert!(escape.is_none());
    }

    #[test]
    fn test_to_portable() {
        let rel = Path::new("docs").join("readme.txt");
        assert_eq!(to_portable(&rel), "docs/readme.txt");
    }
}
