//! Data model for the version-tracking engine.
//!
//! `ProjectData` is the aggregate root and the persisted document; everything
//! else here is either part of that document (`ProjectSettings`, `Version`) or
//! derived state that is computed on demand and never persisted (`FileStatus`,
//! `FileDiff`, `SearchResult`, `SyncChanges`).

use chrono::{DateTime, Utc};
use keepsake_util::{probe, text};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Schema version written into every persisted document.
///
/// Documents with a larger value were written by a newer build and are
/// rejected on load; older documents load with defaults filled in.
pub const SCHEMA_VERSION: u32 = 1;

/// How a working file relates to its recorded baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeType {
    Unchanged,
    Modified,
    Added,
    Deleted,
}

impl FileChangeType {
    /// Stable string form, matching the serialized representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileChangeType::Unchanged => "unchanged",
            FileChangeType::Modified => "modified",
            FileChangeType::Added => "added",
            FileChangeType::Deleted => "deleted",
        }
    }
}

/// Derived status of one working file. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    /// Path relative to the working directory, portable form.
    pub path: String,
    /// File name without directories.
    pub name: String,
    pub change_type: FileChangeType,
    /// Hash of the live file; empty when the file is absent.
    pub current_hash: String,
    /// Hash recorded at the last save/version cut; empty when unknown.
    pub baseline_hash: String,
    pub size: u64,
    pub is_text: bool,
    pub modified_at: DateTime<Utc>,
}

impl FileStatus {
    /// Probe a working file and classify it against its baseline hash.
    ///
    /// An empty `baseline_hash` means the file has no recorded state: present
    /// means added. A missing file with a recorded baseline means deleted.
    pub fn probe(working_path: &Path, relative_path: &str, baseline_hash: &str) -> Self {
        let name = Path::new(relative_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(relative_path)
            .to_string();
        let is_text = probe::is_text_file(Path::new(relative_path));

        if !working_path.exists() {
            return Self {
                path: relative_path.to_string(),
                name,
                change_type: FileChangeType::Deleted,
                current_hash: String::new(),
                baseline_hash: baseline_hash.to_string(),
                size: 0,
                is_text,
                modified_at: DateTime::<Utc>::MIN_UTC,
            };
        }

        let current_hash = probe::file_hash(working_path);
        let change_type = if baseline_hash.is_empty() {
            FileChangeType::Added
        } else if current_hash != baseline_hash {
            FileChangeType::Modified
        } else {
            FileChangeType::Unchanged
        };

        Self {
            path: relative_path.to_string(),
            name,
            change_type,
            current_hash,
            baseline_hash: baseline_hash.to_string(),
            size: probe::file_size(working_path),
            is_text,
            modified_at: probe::file_mtime(working_path),
        }
    }
}

/// One cut version: a numbered, full-copy snapshot of the tracked files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// 1-based, contiguous, immutable once assigned.
    pub number: u32,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Relative paths recorded in this version, portable form.
    pub files: Vec<String>,
    /// Free-text notes, editable at any time.
    #[serde(default)]
    pub notes: String,
}

impl Version {
    /// Create a new version record stamped with the current time.
    pub fn new(number: u32, description: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            number,
            description: description.into(),
            created_at: Utc::now(),
            files,
            notes: String::new(),
        }
    }

    /// Description truncated for constrained listings.
    pub fn short_description(&self) -> String {
        text::truncate(&self.description, 50)
    }

    /// Check if this version records a specific relative path.
    pub fn contains_file(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }
}

/// User-editable project metadata, replaced wholesale on edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProjectSettings {
    /// Create settings for a freshly created project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            author: String::new(),
            created_at: Utc::now(),
            tags: Vec::new(),
        }
    }
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self::new("")
    }
}

/// The aggregate root: everything the engine persists for one project.
///
/// Loaded and saved wholesale on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectData {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub settings: ProjectSettings,
    /// 0 = no version cut yet.
    #[serde(default)]
    pub current_version: u32,
    /// The declared tracked set, kept sorted.
    #[serde(default)]
    pub tracked_files: Vec<String>,
    /// Append-only, ordered by number.
    #[serde(default)]
    pub versions: Vec<Version>,
    /// Relative path -> last recorded content hash for the current version.
    #[serde(default)]
    pub file_hashes: BTreeMap<String, String>,
}

impl ProjectData {
    /// Create an empty (uninitialized) project document.
    pub fn new(settings: ProjectSettings) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            settings,
            current_version: 0,
            tracked_files: Vec::new(),
            versions: Vec::new(),
            file_hashes: BTreeMap::new(),
        }
    }

    /// Find a version by number.
    pub fn version_by_number(&self, number: u32) -> Option<&Version> {
        self.versions.iter().find(|v| v.number == number)
    }

    /// Find a version by number, mutably.
    pub fn version_by_number_mut(&mut self, number: u32) -> Option<&mut Version> {
        self.versions.iter_mut().find(|v| v.number == number)
    }

    /// The newest version record, if any.
    pub fn latest_version(&self) -> Option<&Version> {
        self.versions.iter().max_by_key(|v| v.number)
    }

    /// The newest version number, 0 when no version exists.
    pub fn latest_version_number(&self) -> u32 {
        self.latest_version().map(|v| v.number).unwrap_or(0)
    }

    /// The recorded hash for a path; empty when none is recorded.
    pub fn recorded_hash(&self, path: &str) -> &str {
        self.file_hashes.get(path).map(String::as_str).unwrap_or("")
    }
}

/// One side of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffTarget {
    /// No prior content (file did not exist on this side).
    Empty,
    /// A stored snapshot.
    Version(u32),
    /// The live working copy.
    Working,
}

impl std::fmt::Display for DiffTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffTarget::Empty => write!(f, "empty"),
            DiffTarget::Version(n) => write!(f, "v{n}"),
            DiffTarget::Working => write!(f, "current"),
        }
    }
}

/// Tag of one output line of a computed diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    /// Hunk header (`@@ -a,b +c,d @@`).
    Context,
    Removed,
    Added,
    Unchanged,
}

/// One line of a computed diff, prefix characters stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub text: String,
}

impl DiffLine {
    pub fn new(kind: DiffLineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Derived comparison of one file between two targets. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct FileDiff {
    /// Display path (relative, portable form).
    pub path: String,
    pub old: DiffTarget,
    pub new: DiffTarget,
    pub old_content: String,
    pub new_content: String,
    pub is_text: bool,
    /// Empty for binary files and for identical content.
    pub lines: Vec<DiffLine>,
}

impl FileDiff {
    /// Whether the two sides differ byte-wise.
    ///
    /// Defined on content, not on `lines`: a binary file with differing
    /// bytes has changes even though no diff lines are computed.
    pub fn has_changes(&self) -> bool {
        self.old_content != self.new_content
    }

    /// Coarse classification of the change.
    pub fn change_type(&self) -> FileChangeType {
        if !self.has_changes() {
            FileChangeType::Unchanged
        } else if self.old_content.is_empty() {
            FileChangeType::Added
        } else if self.new_content.is_empty() {
            FileChangeType::Deleted
        } else {
            FileChangeType::Modified
        }
    }
}

/// One matched line from a snapshot search. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Number of the version whose snapshot matched.
    pub version: u32,
    pub path: String,
    /// 1-based.
    pub line_number: usize,
    /// The matched line, trimmed.
    pub line: String,
    /// The query that matched.
    pub query: String,
}

/// Reconciliation delta between the declared file set and the disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncChanges {
    /// On disk but undeclared. Sorted.
    pub added: Vec<String>,
    /// Declared but absent on disk. Sorted.
    pub removed: Vec<String>,
    /// Declared, present, and hash-divergent. Sorted.
    pub modified: Vec<String>,
}

impl SyncChanges {
    /// True when the working directory matches the declared state.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_version_lookup() {
        let mut data = ProjectData::new(ProjectSettings::new("demo"));
        data.versions.push(Version::new(1, "first", vec![]));
        data.versions.push(Version::new(2, "second", vec![]));

        assert_eq!(data.version_by_number(2).unwrap().description, "second");
        assert!(data.version_by_number(9).is_none());
        assert_eq!(data.latest_version_number(), 2);
    }

    #[test]
    fn test_recorded_hash_defaults_empty() {
        let mut data = ProjectData::new(ProjectSettings::new("demo"));
        data.file_hashes
            .insert("a.txt".to_string(), "abc".to_string());

        assert_eq!(data.recorded_hash("a.txt"), "abc");
        assert_eq!(data.recorded_hash("missing.txt"), "");
    }

    #[test]
    fn test_legacy_document_fills_defaults() {
        // A minimal document from an older build: no schema_version, no
        // notes on versions, no file_hashes.
        let json = r#"{
            "settings": {"name": "old", "created_at": "2023-04-01T10:00:00Z"},
            "current_version": 1,
            "versions": [{
                "number": 1,
                "description": "first",
                "created_at": "2023-04-01T10:00:00Z",
                "files": ["a.txt"]
            }]
        }"#;

        let data: ProjectData = serde_json::from_str(json).unwrap();
        assert_eq!(data.schema_version, 0);
        assert_eq!(data.settings.name, "old");
        assert_eq!(data.settings.author, "");
        assert_eq!(data.versions[0].notes, "");
        assert!(data.tracked_files.is_empty());
        assert!(data.file_hashes.is_empty());
    }

    #[test]
    fn test_document_roundtrip() {
        let mut data = ProjectData::new(ProjectSettings::new("demo"));
        let mut version = Version::new(1, "first", vec!["a.txt".to_string()]);
        version.notes = "remember this".to_string();
        data.versions.push(version);
        data.current_version = 1;
        data.tracked_files = vec!["a.txt".to_string()];
        data.file_hashes
            .insert("a.txt".to_string(), "abc".to_string());

        let json = serde_json::to_string(&data).unwrap();
        let reloaded: ProjectData = serde_json::from_str(&json).unwrap();

        assert_eq!(reloaded.current_version, 1);
        assert_eq!(reloaded.tracked_files, data.tracked_files);
        assert_eq!(reloaded.versions, data.versions);
        assert_eq!(reloaded.file_hashes, data.file_hashes);
    }

    #[test]
    fn test_file_status_classification() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        let hash = probe::file_hash(&path);

        let unchanged = FileStatus::probe(&path, "a.txt", &hash);
        assert_eq!(unchanged.change_type, FileChangeType::Unchanged);
        assert_eq!(unchanged.name, "a.txt");
        assert_eq!(unchanged.size, 5);
        assert!(unchanged.is_text);

        let added = FileStatus::probe(&path, "a.txt", "");
        assert_eq!(added.change_type, FileChangeType::Added);

        let modified = FileStatus::probe(&path, "a.txt", "different-hash");
        assert_eq!(modified.change_type, FileChangeType::Modified);

        let deleted = FileStatus::probe(&dir.path().join("gone.txt"), "gone.txt", &hash);
        assert_eq!(deleted.change_type, FileChangeType::Deleted);
        assert_eq!(deleted.current_hash, "");
    }

    #[test]
    fn test_diff_target_display() {
        assert_eq!(DiffTarget::Version(3).to_string(), "v3");
        assert_eq!(DiffTarget::Working.to_string(), "current");
        assert_eq!(DiffTarget::Empty.to_string(), "empty");
    }

    #[test]
    fn test_file_diff_change_type() {
        let mut diff = FileDiff {
            path: "a.txt".to_string(),
            old: DiffTarget::Version(1),
            new: DiffTarget::Working,
            old_content: "one".to_string(),
            new_content: "one".to_string(),
            is_text: true,
            lines: Vec::new(),
        };
        assert!(!diff.has_changes());
        assert_eq!(diff.change_type(), FileChangeType::Unchanged);

        diff.new_content = "two".to_string();
        assert_eq!(diff.change_type(), FileChangeType::Modified);

        diff.old_content = String::new();
        assert_eq!(diff.change_type(), FileChangeType::Added);
    }

    #[test]
    fn test_short_description() {
        let version = Version::new(1, "d".repeat(80), vec![]);
        let short = version.short_description();
        assert!(short.chars().count() <= 50);
        assert!(short.ends_with("..."));
    }
}
