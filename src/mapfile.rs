//! Release map documents: one `project=tag[,options]` association per line.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::types::{MapEntry, Tag};
use crate::workspace::Workspace;

/// File extension of map documents.
pub const MAP_FILE_EXTENSION: &str = "map";

/// `[kind@]project = tag[,options]`. Group 1 is the project, group 2 the tag.
#[allow(clippy::expect_used, reason = "hardcoded pattern, checked by tests")]
static MAP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^\s*(?:[\w.-]+@)?([^=\s@,]+)\s*=\s*([^,\s]*)").expect("valid regex");
});

/// Whether a line carries no entry.
fn is_comment_or_blank(line: &str) -> bool {
    let trimmed = line.trim();
    return trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with('!')
        || trimmed.starts_with("//");
}

/// Parse one line into an entry. Malformed lines yield `None`.
fn parse_line(line: &str) -> Option<MapEntry> {
    if is_comment_or_blank(line) {
        return None;
    }
    let caps = MAP_LINE.captures(line)?;
    let project = caps.get(1)?.as_str().to_string();
    let tag = Tag::new(caps.get(2).map_or("", |m| return m.as_str()));
    return Some(MapEntry { project, tag });
}

/// Parse a whole map document. Entries keep document order; a project
/// listed twice keeps its first entry.
pub fn parse_entries(content: &str) -> Vec<MapEntry> {
    let mut entries: Vec<MapEntry> = Vec::new();
    for entry in content.lines().filter_map(parse_line) {
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }
    return entries;
}

/// Result of rewriting a project's tag in a map document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUpdate {
    /// Whether `contents` differs from the input.
    pub changed: bool,
    /// The full rewritten document.
    pub contents: String,
}

/// Replace the tag on the first line listing `project`. Every other byte
/// of the document is preserved.
pub fn rewrite_tag(content: &str, project: &str, tag: &Tag) -> TagUpdate {
    let mut contents = String::with_capacity(content.len());
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        if !replaced && let Some(rewritten) = rewrite_line(line, project, tag) {
            contents.push_str(&rewritten);
            replaced = true;
            continue;
        }
        contents.push_str(line);
    }

    let changed = contents != content;
    return TagUpdate { changed, contents };
}

/// The line with its tag field replaced, if it lists `project`. The line
/// terminator is matched separately so an empty tag at end of line stays
/// on its own line.
fn rewrite_line(line: &str, project: &str, tag: &Tag) -> Option<String> {
    let body = line.trim_end_matches(['\r', '\n']);
    let terminator = line.get(body.len()..)?;
    if is_comment_or_blank(body) {
        return None;
    }
    let caps = MAP_LINE.captures(body)?;
    if caps.get(1)?.as_str() != project {
        return None;
    }
    let tag_field = caps.get(2)?;
    let before = body.get(..tag_field.start())?;
    let after = body.get(tag_field.end()..)?;
    return Some(format!("{before}{tag}{after}{terminator}"));
}

/// One map document and the entries of its last successful parse.
#[derive(Debug, Clone)]
pub struct MapFile {
    /// Entries in document order.
    entries: Vec<MapEntry>,
    /// Whether `entries` reflects the current content of the file.
    parsed: bool,
    /// Workspace-relative path of the document.
    path: PathBuf,
}

impl MapFile {
    /// Projects listed in this file that currently exist and are open.
    pub fn accessible_projects<'a>(&'a self, workspace: &dyn Workspace) -> Vec<&'a str> {
        return self
            .entries
            .iter()
            .map(|e| return e.project.as_str())
            .filter(|p| return workspace.is_accessible(p))
            .collect();
    }

    /// Whether the file has an entry for `project`.
    pub fn contains(&self, project: &str) -> bool {
        return self.entry_for(project).is_some();
    }

    /// Entries of the last successful parse, in document order.
    pub fn entries(&self) -> &[MapEntry] {
        return &self.entries;
    }

    /// The entry for `project`, if listed.
    pub fn entry_for(&self, project: &str) -> Option<&MapEntry> {
        return self.entries.iter().find(|e| return e.project == project);
    }

    /// Whether the entries reflect the file's current content.
    pub const fn is_parsed(&self) -> bool {
        return self.parsed;
    }

    /// A map file for `path` with no entries yet.
    pub const fn new(path: PathBuf) -> Self {
        return Self { entries: Vec::new(), parsed: false, path };
    }

    /// Construct and parse eagerly. A read failure is logged and leaves the
    /// file unparsed with no entries.
    pub fn open(workspace: &dyn Workspace, path: PathBuf) -> Self {
        let mut file = Self::new(path);
        if let Err(e) = file.reload(workspace) {
            tracing::warn!("failed to read map file {}: {e}", file.path.display());
        }
        return file;
    }

    /// Workspace-relative path of the document.
    pub fn path(&self) -> &Path {
        return &self.path;
    }

    /// Re-read and re-parse the document. The entry list is swapped in one
    /// step; on a read failure the previous entries stay but the file is
    /// marked unparsed.
    ///
    /// # Errors
    ///
    /// Returns the workspace's read error.
    pub fn reload(&mut self, workspace: &dyn Workspace) -> Result<(), Error> {
        let content = match workspace.read(&self.path) {
            Err(e) => {
                self.parsed = false;
                return Err(e);
            },
            Ok(c) => c,
        };
        self.entries = parse_entries(&content);
        self.parsed = true;
        return Ok(());
    }

    /// Render the document with `project`'s tag replaced. Nothing is written.
    ///
    /// # Errors
    ///
    /// Returns the workspace's read error.
    pub fn update_tag(
        &self,
        workspace: &dyn Workspace,
        project: &str,
        tag: &Tag,
    ) -> Result<TagUpdate, Error> {
        let content = workspace.read(&self.path)?;
        return Ok(rewrite_tag(&content, project, tag));
    }
}

/// Whether a path names a map document.
pub fn is_map_file(path: &Path) -> bool {
    return path.extension().is_some_and(|ext| return ext == MAP_FILE_EXTENSION);
}
