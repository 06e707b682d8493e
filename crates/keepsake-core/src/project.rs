//! Project orchestration: the version lifecycle state machine.
//!
//! A `Project` owns one `ProjectData` aggregate and the snapshot directories
//! under its root. It moves between two states: UNINITIALIZED
//! (`current_version == 0`, nothing snapshotted yet) and ACTIVE
//! (`current_version >= 1`, a live snapshot directory exists). The current
//! version's snapshot directory doubles as the working directory; edits land
//! there in place and are reconciled against recorded hashes.
//!
//! Multi-file copy/rehash sequences are not transactional. An interruption
//! can leave a snapshot directory partially populated before its Version
//! record is appended (the version then simply does not exist) or leave
//! `file_hashes` briefly out of step with the declared file list; the next
//! full re-sync repairs the latter.

use crate::diff::DiffEngine;
use crate::error::{ProjectError, ProjectResult};
use crate::models::{
    DiffTarget, FileDiff, FileStatus, ProjectData, ProjectSettings, SearchResult, SyncChanges,
    Version, SCHEMA_VERSION,
};
use crate::search::SearchEngine;
use chrono::Utc;
use keepsake_storage::{JsonStorage, Storage, StorageError};
use keepsake_util::{path, probe, validate};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Directory under the project root holding one subdirectory per version.
pub const VERSIONS_DIR: &str = "versions";

/// Directory under the project root mirroring the bytes behind each entry
/// in `file_hashes`. Needed to diff a modified working file against the
/// content that produced its recorded hash.
pub const BASELINE_DIR: &str = "baseline";

/// Name of the persisted document in the project root.
pub const METADATA_FILE: &str = "project.json";

/// Storage key that maps to [`METADATA_FILE`].
const METADATA_KEY: &str = "project";

/// One tracked project: the persisted aggregate plus its snapshot layout.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    data: ProjectData,
    storage: JsonStorage,
    diff_engine: DiffEngine,
    search_engine: SearchEngine,
}

impl Project {
    fn attach(root: PathBuf, data: ProjectData) -> Self {
        let storage = JsonStorage::new(&root);
        let diff_engine = DiffEngine::new(&root);
        let search_engine = SearchEngine::new(&root);
        Self {
            root,
            data,
            storage,
            diff_engine,
            search_engine,
        }
    }

    /// Create a new project at `root`.
    ///
    /// The name is validated before anything touches the disk, and an
    /// existing non-empty root is rejected. With `initial_files`, version 1
    /// is cut immediately and the project comes up ACTIVE; otherwise it is
    /// persisted UNINITIALIZED.
    pub fn create(
        root: impl Into<PathBuf>,
        name: &str,
        initial_files: Option<&[PathBuf]>,
        settings: Option<ProjectSettings>,
    ) -> ProjectResult<Self> {
        validate::project_name(name)?;

        let root = root.into();
        if root.exists() && root.read_dir()?.next().is_some() {
            return Err(ProjectError::AlreadyExists(name.to_string()));
        }
        fs::create_dir_all(root.join(VERSIONS_DIR))?;

        let settings = settings.unwrap_or_else(|| ProjectSettings::new(name));
        let mut project = Self::attach(root, ProjectData::new(settings));

        match initial_files {
            Some(files) if !files.is_empty() => {
                project.create_new_version("Initial import", Some(files))?;
            }
            _ => project.save()?,
        }

        info!(name, root = %project.root.display(), "Created project");
        Ok(project)
    }

    /// Load a project from its root directory.
    ///
    /// Older documents load with defaults filled in; documents written by a
    /// newer schema are rejected rather than guessed at.
    pub fn load(root: impl Into<PathBuf>) -> ProjectResult<Self> {
        let root = root.into();
        let storage = JsonStorage::new(&root);

        let mut data: ProjectData = storage
            .read(&[METADATA_KEY])?
            .ok_or_else(|| StorageError::not_found(&[METADATA_KEY]))?;

        if data.schema_version > SCHEMA_VERSION {
            return Err(ProjectError::Schema {
                found: data.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        data.schema_version = SCHEMA_VERSION;

        // Legacy documents may lack settings entirely; fall back to the
        // directory name.
        if data.settings.name.is_empty() {
            if let Some(dir_name) = root.file_name().and_then(|n| n.to_str()) {
                data.settings.name = dir_name.to_string();
            }
        }

        debug!(root = %root.display(), versions = data.versions.len(), "Loaded project");
        Ok(Self::attach(root, data))
    }

    /// Persist the document wholesale (atomic write).
    fn save(&self) -> ProjectResult<()> {
        self.storage.write(&[METADATA_KEY], &self.data)?;
        Ok(())
    }

    // --- read accessors -------------------------------------------------

    /// The project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The project name from settings.
    pub fn name(&self) -> &str {
        &self.data.settings.name
    }

    /// The current version number, 0 when no version has been cut.
    pub fn current_version(&self) -> u32 {
        self.data.current_version
    }

    /// Whether a live snapshot directory exists to work in.
    pub fn is_active(&self) -> bool {
        self.data.current_version > 0
    }

    /// Copy of the declared tracked file set.
    pub fn tracked_files(&self) -> Vec<String> {
        self.data.tracked_files.clone()
    }

    /// Copy of all version records, in creation order.
    pub fn versions(&self) -> Vec<Version> {
        self.data.versions.clone()
    }

    /// Version record by number.
    pub fn version(&self, number: u32) -> Option<Version> {
        self.data.version_by_number(number).cloned()
    }

    /// Current project settings.
    pub fn settings(&self) -> &ProjectSettings {
        &self.data.settings
    }

    /// Snapshot directory of a version.
    pub fn version_dir(&self, number: u32) -> PathBuf {
        self.root.join(VERSIONS_DIR).join(format!("v{number}"))
    }

    /// The live working directory, i.e. the current version's snapshot
    /// directory. `None` while UNINITIALIZED.
    pub fn current_version_dir(&self) -> Option<PathBuf> {
        if self.data.current_version == 0 {
            None
        } else {
            Some(self.version_dir(self.data.current_version))
        }
    }

    /// Resolve a relative path inside the working directory,
    /// rejecting traversal outside it.
    pub fn working_file_path(&self, relative_path: &str) -> ProjectResult<PathBuf> {
        let base = self
            .current_version_dir()
            .unwrap_or_else(|| self.root.clone());
        path::safe_join(&base, Path::new(relative_path))
            .ok_or_else(|| ProjectError::invalid_path(relative_path))
    }

    fn baseline_file(&self, relative_path: &str) -> Option<PathBuf> {
        path::safe_join(&self.root.join(BASELINE_DIR), Path::new(relative_path))
    }

    // --- hashing & baseline mirror --------------------------------------

    /// Rehash the given working files, refreshing `file_hashes` and the
    /// baseline mirror. Paths absent from disk lose their entries.
    fn update_file_hashes(&mut self, paths: &[String]) -> ProjectResult<()> {
        let Some(working_dir) = self.current_version_dir() else {
            return Ok(());
        };

        for relative_path in paths {
            let Some(full_path) = path::safe_join(&working_dir, Path::new(relative_path)) else {
                warn!(file = %relative_path, "Skipping path outside working directory");
                continue;
            };

            if full_path.exists() {
                let hash = probe::file_hash(&full_path);
                if let Some(baseline) = self.baseline_file(relative_path) {
                    if let Some(parent) = baseline.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::copy(&full_path, &baseline)?;
                }
                self.data.file_hashes.insert(relative_path.clone(), hash);
                debug!(file = %relative_path, "Recorded baseline");
            } else {
                self.data.file_hashes.remove(relative_path);
                if let Some(baseline) = self.baseline_file(relative_path) {
                    let _ = fs::remove_file(baseline);
                }
            }
        }

        Ok(())
    }

    /// Make `file_hashes` describe exactly `files`: stale entries are
    /// pruned, then every listed file is rehashed.
    fn sync_hashes_to(&mut self, files: &[String]) -> ProjectResult<()> {
        self.data
            .file_hashes
            .retain(|recorded, _| files.iter().any(|f| f == recorded));
        self.update_file_hashes(files)
    }

    // --- version lifecycle ----------------------------------------------

    /// Cut a new version.
    ///
    /// From UNINITIALIZED, `external_files` bootstrap the snapshot: each is
    /// copied in by basename and becomes the tracked set. From ACTIVE, the
    /// entire current snapshot directory is copied recursively and
    /// re-enumerated. Either way the new version becomes current, its files
    /// are rehashed, and the record is appended.
    pub fn create_new_version(
        &mut self,
        description: &str,
        external_files: Option<&[PathBuf]>,
    ) -> ProjectResult<Version> {
        validate::version_description(description)?;

        let number = self.data.latest_version_number() + 1;
        let new_dir = self.version_dir(number);
        fs::create_dir_all(&new_dir)?;

        let mut files = Vec::new();
        if !self.is_active() {
            if let Some(externals) = external_files {
                for source in externals {
                    let Some(file_name) = source.file_name().and_then(|n| n.to_str()) else {
                        warn!(source = %source.display(), "Skipping file without a usable name");
                        continue;
                    };
                    fs::copy(source, new_dir.join(file_name))?;
                    debug!(file = file_name, "Imported into version");
                    files.push(file_name.to_string());
                }
            }
            files.sort();
            self.data.tracked_files = files.clone();
        } else if let Some(source_dir) = self.current_version_dir() {
            if source_dir.exists() {
                copy_dir_recursive(&source_dir, &new_dir)?;
            }
            files = collect_files(&new_dir);
        }

        self.data.current_version = number;
        self.sync_hashes_to(&files)?;

        let version = Version::new(number, description, files);
        self.data.versions.push(version.clone());
        self.save()?;

        info!(version = number, files = version.files.len(), "Created version");
        Ok(version)
    }

    /// Record the working directory's current content as the saved state of
    /// the current version: rehash its file list and refresh its timestamp.
    /// No files are copied between snapshots.
    pub fn save_to_current_version(&mut self) -> ProjectResult<()> {
        if !self.is_active() {
            return Err(ProjectError::state(
                "There is no version to save into. Create a version first.",
            ));
        }

        let files = self
            .data
            .version_by_number(self.data.current_version)
            .map(|v| v.files.clone())
            .ok_or_else(|| ProjectError::state("The current version record is missing."))?;

        self.sync_hashes_to(&files)?;
        if let Some(version) = self.data.version_by_number_mut(self.data.current_version) {
            version.created_at = Utc::now();
        }
        self.save()?;

        info!(version = self.data.current_version, "Saved working state");
        Ok(())
    }

    /// Switch the current version without touching snapshot content.
    ///
    /// The previous current version keeps any in-place edits in its own
    /// directory. Hashes and the baseline mirror are recomputed against the
    /// target version's file list so change detection tracks the new
    /// working directory. Returns false for an unknown version, leaving
    /// everything untouched.
    pub fn rollback_to_version(&mut self, number: u32) -> ProjectResult<bool> {
        let Some(files) = self
            .data
            .version_by_number(number)
            .map(|v| v.files.clone())
        else {
            return Ok(false);
        };

        self.data.current_version = number;
        self.sync_hashes_to(&files)?;
        self.save()?;

        info!(version = number, "Switched current version");
        Ok(true)
    }

    /// Attach free-text notes to a version, current or not. Returns false
    /// for an unknown version.
    pub fn update_version_notes(&mut self, number: u32, notes: &str) -> ProjectResult<bool> {
        match self.data.version_by_number_mut(number) {
            Some(version) => {
                version.notes = notes.to_string();
                self.save()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the project settings wholesale.
    pub fn update_settings(&mut self, settings: ProjectSettings) -> ProjectResult<()> {
        self.data.settings = settings;
        self.save()
    }

    // --- tracked-file management ----------------------------------------

    /// Copy external files into the working directory by basename and
    /// register them. A name collision overwrites (last write wins).
    pub fn add_tracked_files(&mut self, sources: &[PathBuf]) -> ProjectResult<()> {
        let Some(working_dir) = self.current_version_dir() else {
            return Err(ProjectError::state(
                "Files can only be added once a version exists. Create a version first.",
            ));
        };

        let mut newly_added = Vec::new();
        for source in sources {
            let Some(file_name) = source.file_name().and_then(|n| n.to_str()) else {
                warn!(source = %source.display(), "Skipping file without a usable name");
                continue;
            };

            let destination = working_dir.join(file_name);
            if source != &destination {
                fs::copy(source, &destination)?;
            }
            debug!(file = file_name, "Added tracked file");

            if !self.data.tracked_files.iter().any(|f| f == file_name) {
                self.data.tracked_files.push(file_name.to_string());
                self.data.tracked_files.sort();
            }

            if let Some(version) = self.data.version_by_number_mut(self.data.current_version) {
                if !version.contains_file(file_name) {
                    version.files.push(file_name.to_string());
                    version.files.sort();
                    newly_added.push(file_name.to_string());
                }
            }
        }

        self.update_file_hashes(&newly_added)?;
        self.save()?;

        info!(count = newly_added.len(), "Registered tracked files");
        Ok(())
    }

    /// Detach a file from the whole project: every version's file list, the
    /// tracked set, its recorded hash, and the on-disk working copy. This
    /// is irreversible.
    pub fn remove_tracked_file(&mut self, relative_path: &str) -> ProjectResult<()> {
        self.data.tracked_files.retain(|f| f != relative_path);
        for version in &mut self.data.versions {
            version.files.retain(|f| f != relative_path);
        }
        self.data.file_hashes.remove(relative_path);

        if self.is_active() {
            let full_path = self.working_file_path(relative_path)?;
            if full_path.exists() {
                fs::remove_file(&full_path)?;
            }
        }
        if let Some(baseline) = self.baseline_file(relative_path) {
            let _ = fs::remove_file(baseline);
        }

        self.save()?;
        info!(file = relative_path, "Removed tracked file");
        Ok(())
    }

    // --- reconciliation --------------------------------------------------

    /// Compare the declared state of the current version against the disk:
    /// removed (declared, absent), added (present, undeclared), modified
    /// (declared, present, hash-divergent). Walks and rehashes on every
    /// call; tracked sets are small and human-curated.
    pub fn all_changes(&self) -> SyncChanges {
        let mut changes = SyncChanges::default();

        let Some(working_dir) = self.current_version_dir() else {
            return changes;
        };
        let declared: BTreeSet<String> = self
            .data
            .version_by_number(self.data.current_version)
            .map(|v| v.files.iter().cloned().collect())
            .unwrap_or_default();

        let on_disk: BTreeSet<String> = collect_files(&working_dir).into_iter().collect();

        changes.removed = declared.difference(&on_disk).cloned().collect();

        for relative_path in &on_disk {
            if !declared.contains(relative_path) {
                changes.added.push(relative_path.clone());
                continue;
            }

            let Some(full_path) = path::safe_join(&working_dir, Path::new(relative_path)) else {
                continue;
            };
            let live_hash = probe::file_hash(&full_path);
            if live_hash != self.data.recorded_hash(relative_path) {
                changes.modified.push(relative_path.clone());
            }
        }

        changes
    }

    /// Apply a reconciliation delta to the declared state: merge added
    /// paths, strip removed ones, rehash the newly added files. Disk
    /// content is never touched.
    pub fn apply_sync_changes(&mut self, changes: &SyncChanges) -> ProjectResult<()> {
        let mut tracked: BTreeSet<String> = self.data.tracked_files.iter().cloned().collect();
        tracked.extend(changes.added.iter().cloned());
        for removed in &changes.removed {
            tracked.remove(removed);
        }
        self.data.tracked_files = tracked.into_iter().collect();

        for removed in &changes.removed {
            self.data.file_hashes.remove(removed);
            if let Some(baseline) = self.baseline_file(removed) {
                let _ = fs::remove_file(baseline);
            }
        }

        if self.is_active() {
            if let Some(version) = self.data.version_by_number_mut(self.data.current_version) {
                let mut files: BTreeSet<String> = version.files.iter().cloned().collect();
                files.extend(changes.added.iter().cloned());
                for removed in &changes.removed {
                    files.remove(removed);
                }
                version.files = files.into_iter().collect();
            }
        }

        self.update_file_hashes(&changes.added)?;
        self.save()?;

        info!(
            added = changes.added.len(),
            removed = changes.removed.len(),
            "Applied sync changes"
        );
        Ok(())
    }

    // --- status & diff queries ------------------------------------------

    /// Status of every file in the union of the current version's file list
    /// and the files actually on disk in the working directory.
    pub fn file_statuses(&self) -> Vec<FileStatus> {
        let Some(working_dir) = self.current_version_dir() else {
            return Vec::new();
        };
        let Some(version) = self.data.version_by_number(self.data.current_version) else {
            return Vec::new();
        };

        let mut all_paths: BTreeSet<String> = version.files.iter().cloned().collect();
        all_paths.extend(collect_files(&working_dir));

        let mut statuses = Vec::with_capacity(all_paths.len());
        for relative_path in &all_paths {
            let Some(full_path) = path::safe_join(&working_dir, Path::new(relative_path)) else {
                warn!(file = %relative_path, "Skipping path outside working directory");
                continue;
            };
            statuses.push(FileStatus::probe(
                &full_path,
                relative_path,
                self.data.recorded_hash(relative_path),
            ));
        }
        statuses
    }

    /// Only the statuses that differ from the recorded state.
    pub fn modified_files(&self) -> Vec<FileStatus> {
        self.file_statuses()
            .into_iter()
            .filter(|s| s.change_type != crate::models::FileChangeType::Unchanged)
            .collect()
    }

    /// Diff the live working file against recorded history.
    ///
    /// Policy: the old side is the byte content that produced the last
    /// recorded baseline hash — the baseline mirror when `version` is the
    /// current version, the stored snapshot otherwise. A file with no
    /// recorded baseline diffs against empty content.
    pub fn compare_with_current(&self, version: u32, relative_path: &str) -> ProjectResult<FileDiff> {
        if !self.is_active() {
            return Err(ProjectError::state(
                "There is no working version to compare against.",
            ));
        }

        let working_path = self.working_file_path(relative_path)?;

        if version == self.data.current_version {
            let baseline = self
                .baseline_file(relative_path)
                .ok_or_else(|| ProjectError::invalid_path(relative_path))?;
            let old_target = if baseline.exists() {
                DiffTarget::Version(version)
            } else {
                DiffTarget::Empty
            };
            Ok(self.diff_engine.compare_two_paths(
                &baseline,
                &working_path,
                old_target,
                DiffTarget::Working,
                relative_path,
            ))
        } else {
            Ok(self
                .diff_engine
                .compare_with_current(version, relative_path, &working_path))
        }
    }

    /// All changed files between two stored versions, keyed by path. Empty
    /// when either version is unknown.
    pub fn version_changes(&self, old_version: u32, new_version: u32) -> BTreeMap<String, FileDiff> {
        let (Some(old), Some(new)) = (
            self.data.version_by_number(old_version),
            self.data.version_by_number(new_version),
        ) else {
            return BTreeMap::new();
        };

        let candidates: Vec<String> = old
            .files
            .iter()
            .chain(new.files.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        self.diff_engine
            .version_changes(old_version, new_version, &candidates)
    }

    /// All changed files between a stored version and the working
    /// directory, keyed by path.
    pub fn working_changes(&self, version: u32) -> ProjectResult<BTreeMap<String, FileDiff>> {
        let Some(version_record) = self.data.version_by_number(version) else {
            return Ok(BTreeMap::new());
        };

        let mut candidates: BTreeSet<String> = version_record.files.iter().cloned().collect();
        if let Some(working_dir) = self.current_version_dir() {
            candidates.extend(collect_files(&working_dir));
        }

        let mut changes = BTreeMap::new();
        for relative_path in candidates {
            let diff = self.compare_with_current(version, &relative_path)?;
            if diff.has_changes() {
                changes.insert(relative_path, diff);
            }
        }
        Ok(changes)
    }

    // --- search ----------------------------------------------------------

    /// Search stored snapshot content across all versions.
    pub fn search_in_versions(
        &self,
        query: &str,
        extensions: Option<&[String]>,
        case_sensitive: bool,
    ) -> Vec<SearchResult> {
        self.search_engine
            .search_in_versions(query, &self.data.versions, extensions, case_sensitive)
    }

    /// Search version descriptions.
    pub fn search_version_descriptions(&self, query: &str, case_sensitive: bool) -> Vec<Version> {
        self.search_engine
            .search_version_descriptions(query, &self.data.versions, case_sensitive)
    }
}

/// Enumerate all files under a directory as sorted, portable relative paths.
///
/// Unreadable entries are skipped; a missing directory yields nothing.
fn collect_files(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    if !dir.exists() {
        return files;
    }

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            files.push(path::to_portable(relative));
        }
    }

    files.sort();
    files
}

/// Copy a directory tree, preserving structure.
fn copy_dir_recursive(source: &Path, destination: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
