//! Content and description search across stored versions.

use crate::models::{SearchResult, Version};
use crate::project::VERSIONS_DIR;
use keepsake_util::probe;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Scans stored snapshots for text matches.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    versions_dir: PathBuf,
}

impl SearchEngine {
    /// Create a search engine for a project root.
    pub fn new(project_root: &Path) -> Self {
        Self {
            versions_dir: project_root.join(VERSIONS_DIR),
        }
    }

    /// Search the stored snapshots of the given versions, line by line.
    ///
    /// Only files recorded in each version are scanned; binary, missing, and
    /// extension-filtered files are skipped. Matching is a substring check,
    /// case-folded unless `case_sensitive`. Unreadable files are skipped,
    /// never fatal.
    pub fn search_in_versions(
        &self,
        query: &str,
        versions: &[Version],
        extensions: Option<&[String]>,
        case_sensitive: bool,
    ) -> Vec<SearchResult> {
        let needle = if case_sensitive {
            query.to_string()
        } else {
            query.to_lowercase()
        };

        let mut results = Vec::new();

        for version in versions {
            let version_dir = self.versions_dir.join(format!("v{}", version.number));

            for path in &version.files {
                if let Some(extensions) = extensions {
                    let lowered = path.to_lowercase();
                    if !extensions
                        .iter()
                        .any(|ext| lowered.ends_with(&ext.to_lowercase()))
                    {
                        continue;
                    }
                }

                let full_path = version_dir.join(path);
                if !full_path.exists() || !probe::is_text_file(&full_path) {
                    continue;
                }

                // Unreadable files come back empty from the probe and fall
                // through with zero matches.
                let content = probe::read_text(&full_path);
                for (index, line) in content.lines().enumerate() {
                    let matched = if case_sensitive {
                        line.contains(&needle)
                    } else {
                        line.to_lowercase().contains(&needle)
                    };

                    if matched {
                        results.push(SearchResult {
                            version: version.number,
                            path: path.clone(),
                            line_number: index + 1,
                            line: line.trim().to_string(),
                            query: query.to_string(),
                        });
                    }
                }
            }
        }

        debug!(query, matches = results.len(), "Snapshot search finished");
        results
    }

    /// Filter versions whose description contains the query.
    pub fn search_version_descriptions(
        &self,
        query: &str,
        versions: &[Version],
        case_sensitive: bool,
    ) -> Vec<Version> {
        let needle = if case_sensitive {
            query.to_string()
        } else {
            query.to_lowercase()
        };

        versions
            .iter()
            .filter(|version| {
                if case_sensitive {
                    version.description.contains(&needle)
                } else {
                    version.description.to_lowercase().contains(&needle)
                }
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, SearchEngine, Vec<Version>) {
        let dir = tempdir().unwrap();
        let v1 = dir.path().join(VERSIONS_DIR).join("v1");
        let v2 = dir.path().join(VERSIONS_DIR).join("v2");
        std::fs::create_dir_all(&v1).unwrap();
        std::fs::create_dir_all(&v2).unwrap();

        std::fs::write(v1.join("notes.txt"), "Grocery list\napples and Pears\n").unwrap();
        std::fs::write(v2.join("notes.txt"), "Grocery list\napples only\n").unwrap();
        std::fs::write(v2.join("photo.png"), [0u8, 159, 146]).unwrap();

        let versions = vec![
            Version::new(1, "first draft", vec!["notes.txt".to_string()]),
            Version::new(
                2,
                "second pass",
                vec!["notes.txt".to_string(), "photo.png".to_string()],
            ),
        ];

        let engine = SearchEngine::new(dir.path());
        (dir, engine, versions)
    }

    #[test]
    fn test_search_is_case_insensitive_by_default() {
        let (_dir, engine, versions) = setup();

        let results = engine.search_in_versions("APPLES", &versions, None, false);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].version, 1);
        assert_eq!(results[0].line_number, 2);
        assert_eq!(results[0].line, "apples and Pears");
        assert_eq!(results[1].version, 2);
    }

    #[test]
    fn test_search_case_sensitive() {
        let (_dir, engine, versions) = setup();

        let results = engine.search_in_versions("pears", &versions, None, true);
        assert!(results.is_empty());

        let results = engine.search_in_versions("Pears", &versions, None, true);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_search_extension_filter() {
        let (_dir, engine, versions) = setup();

        let results = engine.search_in_versions(
            "apples",
            &versions,
            Some(&[".md".to_string()]),
            false,
        );
        assert!(results.is_empty());

        let results = engine.search_in_versions(
            "apples",
            &versions,
            Some(&[".txt".to_string()]),
            false,
        );
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_skips_binary_and_missing_files() {
        let (dir, engine, mut versions) = setup();

        // A file recorded in the version but gone from the snapshot.
        versions[1].files.push("gone.txt".to_string());
        // photo.png is present but binary; neither should panic or match.
        std::fs::remove_file(dir.path().join(VERSIONS_DIR).join("v2").join("photo.png"))
            .ok();

        let results = engine.search_in_versions("list", &versions, None, false);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_version_descriptions() {
        let (_dir, engine, versions) = setup();

        let hits = engine.search_version_descriptions("SECOND", &versions, false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].number, 2);

        let hits = engine.search_version_descriptions("SECOND", &versions, true);
        assert!(hits.is_empty());
    }
}
