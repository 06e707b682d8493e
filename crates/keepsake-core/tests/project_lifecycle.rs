//! Project lifecycle integration tests.
//!
//! End-to-end scenarios across the data model, diff engine, and orchestrator,
//! run against real temporary directories.

use keepsake_core::{
    DiffLineKind, FileChangeType, Project, ProjectManager, ProjectSettings,
};
use keepsake_util::probe;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn stage_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("Failed to create staging dir");
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write staged file");
    path
}

/// Test the full create / edit / diff / save cycle on one file.
#[test]
fn test_end_to_end_edit_cycle() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let readme = stage_file(&temp.path().join("staging"), "readme.txt", "hello");

    let manager = ProjectManager::new(temp.path().join("workspace"));
    let mut project = manager
        .create_project("Demo", Some(std::slice::from_ref(&readme)), None)
        .expect("Failed to create project");

    // Version 1 exists and the initial hash is recorded.
    assert_eq!(project.current_version(), 1);
    let working = project.working_file_path("readme.txt").unwrap();
    assert_eq!(fs::read_to_string(&working).unwrap(), "hello");

    // Edit the live file.
    fs::write(&working, "hello world").unwrap();

    let statuses = project.file_statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].path, "readme.txt");
    assert_eq!(statuses[0].change_type, FileChangeType::Modified);

    // The diff sees the last-saved bytes on the old side.
    let diff = project.compare_with_current(1, "readme.txt").unwrap();
    assert_eq!(diff.old_content, "hello");
    assert_eq!(diff.new_content, "hello world");
    let removed: Vec<&str> = diff
        .lines
        .iter()
        .filter(|l| l.kind == DiffLineKind::Removed)
        .map(|l| l.text.as_str())
        .collect();
    let added: Vec<&str> = diff
        .lines
        .iter()
        .filter(|l| l.kind == DiffLineKind::Added)
        .map(|l| l.text.as_str())
        .collect();
    assert_eq!(removed, vec!["hello"]);
    assert_eq!(added, vec!["hello world"]);

    // Saving records the new content as the baseline.
    project.save_to_current_version().unwrap();
    assert_eq!(
        project.file_statuses()[0].change_type,
        FileChangeType::Unchanged
    );
    let diff = project.compare_with_current(1, "readme.txt").unwrap();
    assert!(!diff.has_changes());
}

/// Test that sequential version cuts number 1..N in order.
#[test]
fn test_version_numbering() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let note = stage_file(&temp.path().join("staging"), "note.txt", "v1");

    let mut project = Project::create(
        temp.path().join("numbered"),
        "numbered",
        Some(&[note]),
        None,
    )
    .unwrap();

    for expected in 2..=4u32 {
        let version = project
            .create_new_version(&format!("cut number {expected}"), None)
            .unwrap();
        assert_eq!(version.number, expected);
    }

    let numbers: Vec<u32> = project.versions().iter().map(|v| v.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
}

/// Test the reconciliation scenario: tracked {a, b}, disk {b modified, c new}.
#[test]
fn test_sync_reconciliation() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let staging = temp.path().join("staging");
    let a = stage_file(&staging, "a.txt", "alpha");
    let b = stage_file(&staging, "b.txt", "bravo");

    let mut project = Project::create(
        temp.path().join("sync"),
        "sync",
        Some(&[a, b]),
        None,
    )
    .unwrap();

    let working_dir = project.current_version_dir().unwrap();
    fs::remove_file(working_dir.join("a.txt")).unwrap();
    fs::write(working_dir.join("b.txt"), "bravo, but changed").unwrap();
    fs::write(working_dir.join("c.txt"), "charlie").unwrap();

    let changes = project.all_changes();
    assert_eq!(changes.added, vec!["c.txt"]);
    assert_eq!(changes.removed, vec!["a.txt"]);
    assert_eq!(changes.modified, vec!["b.txt"]);

    project.apply_sync_changes(&changes).unwrap();
    assert_eq!(project.tracked_files(), vec!["b.txt", "c.txt"]);

    // a's recorded hash is gone; c's has appeared.
    let reloaded = Project::load(project.root()).unwrap();
    let statuses = reloaded.file_statuses();
    assert!(!statuses.iter().any(|s| s.path == "a.txt"));
    let c_status = statuses.iter().find(|s| s.path == "c.txt").unwrap();
    assert_ne!(c_status.baseline_hash, "");
}

/// Test that rollback switches versions without altering snapshot content.
#[test]
fn test_rollback_preserves_snapshots() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let note = stage_file(&temp.path().join("staging"), "note.txt", "first");

    let mut project = Project::create(
        temp.path().join("rollback"),
        "rollback",
        Some(&[note]),
        None,
    )
    .unwrap();

    let working = project.working_file_path("note.txt").unwrap();
    fs::write(&working, "second draft").unwrap();
    project.create_new_version("second", None).unwrap();
    assert_eq!(project.current_version(), 2);

    assert!(project.rollback_to_version(1).unwrap());
    assert_eq!(project.current_version(), 1);
    assert_eq!(
        fs::read_to_string(project.version_dir(1).join("note.txt")).unwrap(),
        "second draft",
    );
    assert_eq!(
        fs::read_to_string(project.version_dir(2).join("note.txt")).unwrap(),
        "second draft",
    );

    // Unknown versions fail without changing anything.
    assert!(!project.rollback_to_version(99).unwrap());
    assert_eq!(project.current_version(), 1);
}

/// Test that persist-then-reload preserves the document.
#[test]
fn test_persistence_roundtrip() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let recipe = stage_file(&temp.path().join("staging"), "recipe.md", "# Lasagna");

    let settings = ProjectSettings {
        name: "Cooking".to_string(),
        description: "Family recipes".to_string(),
        author: "sam".to_string(),
        created_at: chrono::Utc::now(),
        tags: vec!["food".to_string()],
    };

    let mut project = Project::create(
        temp.path().join("cooking"),
        "Cooking",
        Some(&[recipe]),
        Some(settings),
    )
    .unwrap();
    project.create_new_version("tweaked seasoning", None).unwrap();
    project.update_version_notes(2, "less salt next time").unwrap();

    let reloaded = Project::load(project.root()).unwrap();
    assert_eq!(reloaded.current_version(), 2);
    assert_eq!(reloaded.tracked_files(), project.tracked_files());
    assert_eq!(reloaded.settings().description, "Family recipes");
    assert_eq!(reloaded.settings().tags, vec!["food"]);

    for (original, restored) in project.versions().iter().zip(reloaded.versions()) {
        assert_eq!(original.number, restored.number);
        assert_eq!(original.description, restored.description);
        assert_eq!(original.files, restored.files);
        assert_eq!(original.notes, restored.notes);
        // Timestamps survive to at least second precision.
        assert_eq!(
            original.created_at.timestamp(),
            restored.created_at.timestamp()
        );
    }
}

/// Test searching stored snapshots across versions.
#[test]
fn test_search_across_versions() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let note = stage_file(&temp.path().join("staging"), "note.txt", "milk\neggs\n");

    let mut project = Project::create(
        temp.path().join("search"),
        "search",
        Some(&[note]),
        None,
    )
    .unwrap();

    let working = project.working_file_path("note.txt").unwrap();
    fs::write(&working, "milk\nbutter\n").unwrap();
    project.create_new_version("swap eggs for butter", None).unwrap();

    let hits = project.search_in_versions("milk", None, false);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].version, 1);
    assert_eq!(hits[1].version, 2);

    let hits = project.search_in_versions("eggs", None, false);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].version, 1);
    assert_eq!(hits[0].line_number, 2);

    let descriptions = project.search_version_descriptions("butter", false);
    assert_eq!(descriptions.len(), 1);
    assert_eq!(descriptions[0].number, 2);
}

/// Test that the hash probe is stable and content-sensitive end to end.
#[test]
fn test_hash_stability_and_sensitivity() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let file = stage_file(temp.path(), "data.txt", "payload");

    let first = probe::file_hash(&file);
    let second = probe::file_hash(&file);
    assert_eq!(first, second);

    fs::write(&file, "payloae").unwrap();
    assert_ne!(probe::file_hash(&file), first);
}
