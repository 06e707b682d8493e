//! Line-level diff computation between stored snapshots and working files.

use crate::models::{DiffLine, DiffLineKind, DiffTarget, FileDiff};
use crate::project::VERSIONS_DIR;
use keepsake_util::{probe, text};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Compares file content between snapshot directories and working files.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    versions_dir: PathBuf,
}

impl DiffEngine {
    /// Create a diff engine for a project root.
    pub fn new(project_root: &Path) -> Self {
        Self {
            versions_dir: project_root.join(VERSIONS_DIR),
        }
    }

    /// Resolve a file inside a version's snapshot directory.
    fn version_file(&self, version: u32, path: &str) -> PathBuf {
        self.versions_dir.join(format!("v{version}")).join(path)
    }

    /// Compare two arbitrary paths.
    ///
    /// A missing file reads as empty content. Text classification comes from
    /// `display_path`'s extension; binary files get no diff lines regardless
    /// of byte differences, while `has_changes` stays content-based.
    pub fn compare_two_paths(
        &self,
        old_path: &Path,
        new_path: &Path,
        old: DiffTarget,
        new: DiffTarget,
        display_path: &str,
    ) -> FileDiff {
        let old_content = probe::read_text(old_path);
        let new_content = probe::read_text(new_path);

        let is_text = probe::is_text_file(Path::new(display_path));
        let lines = if is_text {
            compute_diff_lines(&old_content, &new_content)
        } else {
            Vec::new()
        };

        FileDiff {
            path: display_path.to_string(),
            old,
            new,
            old_content,
            new_content,
            is_text,
            lines,
        }
    }

    /// Compare one file between two stored versions.
    pub fn compare_versions(&self, old_version: u32, new_version: u32, path: &str) -> FileDiff {
        self.compare_two_paths(
            &self.version_file(old_version, path),
            &self.version_file(new_version, path),
            DiffTarget::Version(old_version),
            DiffTarget::Version(new_version),
            path,
        )
    }

    /// Compare a stored version of a file against the live working file.
    pub fn compare_with_current(&self, version: u32, path: &str, working_path: &Path) -> FileDiff {
        self.compare_two_paths(
            &self.version_file(version, path),
            working_path,
            DiffTarget::Version(version),
            DiffTarget::Working,
            path,
        )
    }

    /// Diff every candidate path between two versions, keeping only files
    /// that actually changed.
    pub fn version_changes(
        &self,
        old_version: u32,
        new_version: u32,
        candidates: &[String],
    ) -> BTreeMap<String, FileDiff> {
        let mut changes = BTreeMap::new();
        for path in candidates {
            let diff = self.compare_versions(old_version, new_version, path);
            if diff.has_changes() {
                changes.insert(path.clone(), diff);
            }
        }
        changes
    }
}

/// Compute tagged diff lines for text content.
///
/// Line endings are normalized to `\n` first; identical content yields no
/// lines. Hunks carry 3 lines of context and start with one Context line
/// holding the `@@` header.
fn compute_diff_lines(old_content: &str, new_content: &str) -> Vec<DiffLine> {
    if old_content == new_content {
        return Vec::new();
    }

    let old = text::normalize_line_endings(old_content);
    let new = text::normalize_line_endings(new_content);
    let diff = TextDiff::from_lines(old.as_str(), new.as_str());

    let mut lines = Vec::new();
    for group in diff.grouped_ops(3) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        lines.push(DiffLine::new(
            DiffLineKind::Context,
            format!(
                "@@ -{} +{} @@",
                format_range(&old_range),
                format_range(&new_range)
            ),
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let kind = match change.tag() {
                    ChangeTag::Delete => DiffLineKind::Removed,
                    ChangeTag::Insert => DiffLineKind::Added,
                    ChangeTag::Equal => DiffLineKind::Unchanged,
                };
                lines.push(DiffLine::new(kind, change.value().trim_end_matches('\n')));
            }
        }
    }

    lines
}

/// Render a 0-based line range in unified-diff header form.
fn format_range(range: &Range<usize>) -> String {
    let length = range.len();
    if length == 1 {
        return (range.start + 1).to_string();
    }
    let beginning = if length == 0 {
        range.start
    } else {
        range.start + 1
    };
    format!("{beginning},{length}")
}

/// Counts of diff lines by tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Plain-text rendering of computed diffs.
///
/// Output here is unstyled; icons and colors belong to the presentation
/// layer.
pub struct DiffFormatter;

impl DiffFormatter {
    /// Render a diff in unified style with a two-line target header.
    pub fn format(diff: &FileDiff) -> String {
        if !diff.is_text {
            return format!("Binary file: {}", diff.change_type().as_str());
        }
        if !diff.has_changes() {
            return "No changes".to_string();
        }

        let mut out = Vec::with_capacity(diff.lines.len() + 3);
        out.push(format!("--- {}/{}", diff.old, diff.path));
        out.push(format!("+++ {}/{}", diff.new, diff.path));
        out.push(String::new());

        for line in &diff.lines {
            match line.kind {
                DiffLineKind::Context => out.push(line.text.clone()),
                DiffLineKind::Removed => out.push(format!("- {}", line.text)),
                DiffLineKind::Added => out.push(format!("+ {}", line.text)),
                DiffLineKind::Unchanged => out.push(format!("  {}", line.text)),
            }
        }

        out.join("\n")
    }

    /// Count added/removed/unchanged lines.
    pub fn stats(diff: &FileDiff) -> DiffStats {
        let mut stats = DiffStats::default();
        for line in &diff.lines {
            match line.kind {
                DiffLineKind::Added => stats.added += 1,
                DiffLineKind::Removed => stats.removed += 1,
                DiffLineKind::Unchanged => stats.unchanged += 1,
                DiffLineKind::Context => {}
            }
        }
        stats
    }

    /// Compact `+N -N` summary of a diff.
    pub fn summary(diff: &FileDiff) -> String {
        if !diff.has_changes() {
            return "no changes".to_string();
        }

        let stats = Self::stats(diff);
        let mut parts = Vec::new();
        if stats.added > 0 {
            parts.push(format!("+{}", stats.added));
        }
        if stats.removed > 0 {
            parts.push(format!("-{}", stats.removed));
        }

        if parts.is_empty() {
            "changed".to_string()
        } else {
            parts.join(" ")
        }
    }
}
