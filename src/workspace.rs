//! Storage collaborator: the workspace of projects the index and the
//! version checker read from and write to.
//!
//! Resources are addressed by workspace-relative paths whose first
//! component is the owning project's name.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Error;
use crate::locator::{FieldPath, visit_fields};

/// `<natures><nature>` in a project descriptor.
const PROJECT_NATURE: FieldPath<'static> = FieldPath { field: "nature", parent: "natures" };

/// Directory under the workspace root where overwritten content is kept.
pub const HISTORY_DIR: &str = ".relmap/history";

/// Kind of a resource in the workspace tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A regular file.
    File,
    /// A folder inside a project.
    Folder,
    /// A top-level project directory.
    Project,
    /// The workspace root itself.
    Root,
}

/// A child resource returned by [`Workspace::children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Workspace-relative path.
    pub path: PathBuf,
}

/// Everything the core needs from the underlying storage.
pub trait Workspace {
    /// Direct children of a folder, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the folder does not exist, or
    /// `Error::Io` if it cannot be listed.
    fn children(&self, folder: &Path) -> Result<Vec<Resource>, Error>;

    /// Whether the resource currently exists.
    fn exists(&self, path: &Path) -> bool;

    /// Whether the project's descriptor declares the given nature.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the descriptor exists but cannot be read, or
    /// `Error::Xml` if it is not well-formed.
    fn has_nature(&self, project: &str, nature: &str) -> Result<bool, Error>;

    /// Whether the project exists and is open.
    fn is_accessible(&self, project: &str) -> bool;

    /// Names of all projects in the workspace, sorted.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the workspace root cannot be listed.
    fn projects(&self) -> Result<Vec<String>, Error>;

    /// Read the full text content of a file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file does not exist, or `Error::Io`.
    fn read(&self, path: &Path) -> Result<String, Error>;

    /// Absolute location of the workspace on disk.
    fn root(&self) -> &Path;

    /// Replace the full content of a file. With `keep_history`, the previous
    /// content is preserved before it is overwritten.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the history copy or the write fails.
    fn write(&self, path: &Path, contents: &str, keep_history: bool) -> Result<(), Error>;
}

/// Name of the project owning a workspace-relative path.
pub fn project_of(path: &Path) -> Option<&str> {
    return match path.components().next() {
        Some(Component::Normal(name)) => name.to_str(),
        _ => None,
    };
}

/// A workspace backed by a directory on the local filesystem.
/// Projects are the non-hidden direct subdirectories of the root.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    /// Workspace root directory.
    root: PathBuf,
}

impl FsWorkspace {
    /// Open a workspace rooted at `root`.
    pub fn new(root: &Path) -> Self {
        return Self { root: root.to_path_buf() };
    }

    /// Copy the current content of `path` into the history directory as
    /// `<name>.<n>`, numbering copies from 1.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the history directory cannot be created or written.
    fn save_history(&self, path: &Path) -> Result<(), Error> {
        let current = self.root.join(path);
        if !current.is_file() {
            return Ok(());
        }
        let Some(file_name) = path.file_name().and_then(|n| return n.to_str()) else {
            return Ok(());
        };

        let mut history_dir = self.root.join(HISTORY_DIR);
        if let Some(parent) = path.parent() {
            history_dir.push(parent);
        }
        std::fs::create_dir_all(&history_dir)?;

        let prefix = format!("{file_name}.");
        let mut existing = 0_usize;
        for entry in std::fs::read_dir(&history_dir)? {
            if entry?.file_name().to_string_lossy().starts_with(&prefix) {
                existing = existing.saturating_add(1);
            }
        }

        let copy = history_dir.join(format!("{file_name}.{}", existing.saturating_add(1)));
        std::fs::copy(&current, copy)?;
        return Ok(());
    }
}

impl Workspace for FsWorkspace {
    fn children(&self, folder: &Path) -> Result<Vec<Resource>, Error> {
        let dir = self.root.join(folder);
        if !dir.is_dir() {
            return Err(Error::FileNotFound { path: folder.to_path_buf() });
        }

        let mut children = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let kind = if entry.file_type().is_dir() {
                ResourceKind::Folder
            } else {
                ResourceKind::File
            };
            children.push(Resource { kind, path: folder.join(entry.file_name()) });
        }
        return Ok(children);
    }

    fn exists(&self, path: &Path) -> bool {
        return self.root.join(path).exists();
    }

    fn has_nature(&self, project: &str, nature: &str) -> Result<bool, Error> {
        let descriptor = self.root.join(project).join(".project");
        let content = match std::fs::read_to_string(&descriptor) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let mut found = false;
        visit_fields(&content, PROJECT_NATURE, |declared| {
            found = declared.value.trim() == nature;
            return !found;
        })?;
        return Ok(found);
    }

    fn is_accessible(&self, project: &str) -> bool {
        if project.is_empty() || project.starts_with('.') {
            return false;
        }
        return self.root.join(project).is_dir();
    }

    fn projects(&self) -> Result<Vec<String>, Error> {
        let mut projects = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type()?.is_dir() && !name.starts_with('.') {
                projects.push(name);
            }
        }
        projects.sort();
        return Ok(projects);
    }

    fn read(&self, path: &Path) -> Result<String, Error> {
        return match std::fs::read_to_string(self.root.join(path)) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::FileNotFound { path: path.to_path_buf() })
            },
            Err(e) => Err(Error::Io(e)),
            Ok(c) => Ok(c),
        };
    }

    fn root(&self) -> &Path {
        return &self.root;
    }

    fn write(&self, path: &Path, contents: &str, keep_history: bool) -> Result<(), Error> {
        if keep_history {
            self.save_history(path)?;
        }
        std::fs::write(self.root.join(path), contents)?;
        return Ok(());
    }
}
