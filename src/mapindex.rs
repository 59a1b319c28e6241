//! The release map index: every map document in the map folder, kept in
//! step with workspace changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::change::{ChangeKind, ChangeRecord};
use crate::error::Error;
use crate::mapfile::{MapFile, is_map_file};
use crate::types::{MapEntry, Tag};
use crate::vcs::{CancellationToken, VersionControl};
use crate::workspace::{ResourceKind, Workspace};

/// Map documents of one map folder, keyed by workspace-relative path.
///
/// Lookups scan files in path order, so when two files list the same
/// project the lexicographically smaller path wins.
#[derive(Debug)]
pub struct MapIndex {
    /// Map files keyed by their resource path.
    files: BTreeMap<PathBuf, MapFile>,
    /// Workspace-relative path of the folder holding the map documents.
    map_folder: PathBuf,
    /// Name of the project that owns the map folder.
    project: String,
}

impl MapIndex {
    /// Apply one batch of workspace changes.
    ///
    /// Only file records directly inside the map folder are considered.
    /// Additions and content changes update single entries; any removal
    /// triggers a full rebuild, because a removed resource can no longer
    /// be read to tell which entries it contributed. The map folder or its
    /// project appearing or vanishing as a whole also rebuilds, whether or
    /// not the batch lists its files.
    pub fn apply_change(&mut self, workspace: &dyn Workspace, root: &ChangeRecord) {
        let container_moved = self
            .map_folder
            .ancestors()
            .filter(|ancestor| return !ancestor.as_os_str().is_empty())
            .filter_map(|ancestor| return root.find_member(ancestor))
            .any(|record| return record.kind != ChangeKind::Changed);
        if container_moved {
            tracing::debug!("map folder added or removed, rebuilding index");
            self.reload_logged(workspace);
            return;
        }

        let Some(folder) = root.find_member(&self.map_folder) else {
            return;
        };

        let mut rebuild = false;
        for record in &folder.children {
            if record.resource != ResourceKind::File || !is_map_file(&record.path) {
                continue;
            }
            match record.kind {
                ChangeKind::Added => {
                    tracing::debug!("map file added: {}", record.path.display());
                    let file = MapFile::open(workspace, record.path.clone());
                    self.files.insert(record.path.clone(), file);
                },
                ChangeKind::Changed if record.content => {
                    tracing::debug!("map file changed: {}", record.path.display());
                    let file = self
                        .files
                        .entry(record.path.clone())
                        .or_insert_with(|| return MapFile::new(record.path.clone()));
                    if let Err(e) = file.reload(workspace) {
                        tracing::warn!("failed to reload map file {}: {e}", record.path.display());
                    }
                },
                ChangeKind::Changed => {},
                ChangeKind::Removed => rebuild = true,
            }
        }

        if rebuild {
            tracing::debug!("map file removed, rebuilding index");
            self.reload_logged(workspace);
        }
    }

    /// Commit the whole map project.
    ///
    /// A cancelled commit is not an error.
    ///
    /// # Errors
    ///
    /// Returns the version-control collaborator's error for any other failure.
    pub fn commit(
        &self,
        vcs: &dyn VersionControl,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let resources = [PathBuf::from(&self.project)];
        return match vcs.commit(&resources, message, cancel) {
            Err(Error::Interrupted) => {
                tracing::debug!("commit of {} cancelled", self.project);
                Ok(())
            },
            other => other,
        };
    }

    /// All map files, in path order.
    pub fn files(&self) -> impl Iterator<Item = &MapFile> {
        return self.files.values();
    }

    /// Discard all entries and re-read every map document in the map folder.
    /// The new file set replaces the old one in a single assignment. A
    /// missing map folder yields an empty index.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the map folder exists but cannot be listed.
    pub fn load(&mut self, workspace: &dyn Workspace) -> Result<(), Error> {
        if !workspace.exists(&self.map_folder) {
            self.files = BTreeMap::new();
            return Ok(());
        }

        let mut files = BTreeMap::new();
        for child in workspace.children(&self.map_folder)? {
            if child.kind == ResourceKind::File && is_map_file(&child.path) {
                let file = MapFile::open(workspace, child.path.clone());
                files.insert(child.path, file);
            }
        }
        self.files = files;
        return Ok(());
    }

    /// Full rebuild with failures logged.
    fn reload_logged(&mut self, workspace: &dyn Workspace) {
        if let Err(e) = self.load(workspace) {
            tracing::warn!("failed to rebuild map index: {e}");
        }
    }

    /// The entry for `project` from the file that lists it.
    pub fn map_entry_for(&self, project: &str) -> Option<&MapEntry> {
        return self.map_file_for(project)?.entry_for(project);
    }

    /// The map file listing `project`.
    pub fn map_file_for(&self, project: &str) -> Option<&MapFile> {
        return self.files.values().find(|f| return f.contains(project));
    }

    /// Distinct map files listing any of `projects`, in path order.
    /// Unmapped projects contribute nothing.
    pub fn map_files_for(&self, projects: &[&str]) -> Vec<&MapFile> {
        let mut owners: BTreeMap<&Path, &MapFile> = BTreeMap::new();
        for project in projects {
            if let Some(file) = self.map_file_for(project) {
                owners.insert(file.path(), file);
            }
        }
        return owners.into_values().collect();
    }

    /// Workspace-relative path of the map folder.
    pub fn map_folder(&self) -> &Path {
        return &self.map_folder;
    }

    /// Whether the map project exists.
    pub fn maps_are_loaded(&self, workspace: &dyn Workspace) -> bool {
        return workspace.is_accessible(&self.project);
    }

    /// Build the index for `map_folder` inside `project` and load it.
    ///
    /// # Errors
    ///
    /// Returns errors from [`MapIndex::load`].
    pub fn new(workspace: &dyn Workspace, project: &str, map_folder: &str) -> Result<Self, Error> {
        let mut index = Self {
            files: BTreeMap::new(),
            map_folder: Path::new(project).join(map_folder),
            project: project.to_string(),
        };
        index.load(workspace)?;
        return Ok(index);
    }

    /// Name of the project owning the map folder.
    pub fn project(&self) -> &str {
        return &self.project;
    }

    /// Tag for each project, in input order; `HEAD` for unmapped projects.
    pub fn tags_for(&self, projects: &[&str]) -> Vec<Tag> {
        return projects
            .iter()
            .map(|p| {
                return self.map_entry_for(p).map_or_else(Tag::default_tag, |e| return e.tag.clone());
            })
            .collect();
    }

    /// Point `project`'s entry at `tag` and write the owning map file,
    /// keeping history. Nothing is written when the tag is already current.
    /// The index itself picks up the new content from the resulting change
    /// notification.
    ///
    /// Returns whether the file was written; `false` also for unmapped projects.
    ///
    /// # Errors
    ///
    /// Returns read or write errors from the workspace.
    pub fn update_entry_tag(
        &self,
        workspace: &dyn Workspace,
        project: &str,
        tag: &Tag,
    ) -> Result<bool, Error> {
        let Some(file) = self.map_file_for(project) else {
            return Ok(false);
        };
        let update = file.update_tag(workspace, project, tag)?;
        if !update.changed {
            return Ok(false);
        }
        workspace.write(file.path(), &update.contents, true)?;
        return Ok(true);
    }

    /// Map files that list at least one accessible project.
    pub fn valid_map_files(&self, workspace: &dyn Workspace) -> Vec<&MapFile> {
        return self
            .files
            .values()
            .filter(|f| return !f.accessible_projects(workspace).is_empty())
            .collect();
    }
}
