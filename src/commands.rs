//! CLI commands: map lookups, tagging, committing, checking and config edits.

use std::path::Path;
use std::process::ExitCode;

use crate::config::{self, Config};
use crate::diagnostics::{self, DiagnosticStore};
use crate::error::Error;
use crate::mapindex::MapIndex;
use crate::types::{Severity, Tag};
use crate::validation::ValidationEngine;
use crate::vcs::{CancellationToken, GitCli};
use crate::workspace::{FsWorkspace, Workspace as _};

/// Workspace, config and a freshly loaded map index.
struct Loaded {
    /// Parsed configuration.
    config: Config,
    /// The loaded map index.
    index: MapIndex,
    /// Workspace rooted at the command's root.
    workspace: FsWorkspace,
}

/// Load config and index every map document.
///
/// # Errors
///
/// Returns errors from config loading or listing the map folder.
fn load(root: &Path) -> Result<Loaded, Error> {
    let config = Config::load(root)?;
    let workspace = FsWorkspace::new(root);
    let index = MapIndex::new(&workspace, &config.map_project, &config.map_folder)?;
    if !index.maps_are_loaded(&workspace) {
        tracing::warn!("map project `{}` not found in workspace", config.map_project);
    }
    return Ok(Loaded { config, index, workspace });
}

/// Validate every project and print the diagnostics.
/// Exit code 1 when anything was reported.
///
/// # Errors
///
/// Returns errors from config loading or rendering.
pub fn check(root: &Path, format: &str) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let workspace = FsWorkspace::new(root);
    let engine = ValidationEngine::new(&config);
    if engine.severity() == Severity::Ignore {
        eprintln!("POM version checking is disabled (severity = \"ignore\")");
    }

    let mut store = DiagnosticStore::default();
    engine.validate_all(&workspace, &mut store);
    print!("{}", diagnostics::render_all(&store, format)?);

    return Ok(if store.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE });
}

/// Commit the map project with `message`.
///
/// # Errors
///
/// Returns `Error::ProjectNotFound` if the map project is missing, or
/// `Error::CommitFailed` from the version-control tool.
pub fn commit(root: &Path, message: &str) -> Result<(), Error> {
    let loaded = load(root)?;
    if !loaded.index.maps_are_loaded(&loaded.workspace) {
        return Err(Error::ProjectNotFound { name: loaded.config.map_project });
    }
    let vcs = GitCli::new(loaded.workspace.root());
    loaded.index.commit(&vcs, message, &CancellationToken::default())?;
    eprintln!("Committed `{}`", loaded.index.project());
    return Ok(());
}

/// Print the map entry for `project` and the file it came from.
///
/// # Errors
///
/// Returns `Error::UnmappedProject` if no map file lists the project.
pub fn entry(root: &Path, project: &str) -> Result<(), Error> {
    let loaded = load(root)?;
    let Some(file) = loaded.index.map_file_for(project) else {
        return Err(Error::UnmappedProject { name: project.to_string() });
    };
    let Some(entry) = file.entry_for(project) else {
        return Err(Error::UnmappedProject { name: project.to_string() });
    };
    println!("{}={}  ({})", entry.project, entry.tag, file.path().display());
    return Ok(());
}

/// List map files with their entry counts. `valid_only` keeps the files
/// listing at least one project present in the workspace.
///
/// # Errors
///
/// Returns errors from config loading or listing the map folder.
pub fn maps(root: &Path, valid_only: bool) -> Result<(), Error> {
    let loaded = load(root)?;
    let files = if valid_only {
        loaded.index.valid_map_files(&loaded.workspace)
    } else {
        loaded.index.files().collect()
    };

    for file in &files {
        let status = if file.is_parsed() { "" } else { "  (unreadable)" };
        println!("{}  {} entries{status}", file.path().display(), file.entries().len());
    }
    eprintln!("{} map file(s) in {}", files.len(), loaded.index.map_folder().display());
    return Ok(());
}

/// Set the POM version severity in `.relmap.toml`.
///
/// # Errors
///
/// Returns `Error::ConfigInvalid` for an unknown severity or an unparsable
/// config file.
pub fn set_severity(root: &Path, value: &str) -> Result<(), Error> {
    let Some(severity) = Severity::parse(value) else {
        return Err(Error::ConfigInvalid {
            path: root.join(config::CONFIG_FILE),
            reason: format!("unknown severity `{value}`"),
        });
    };
    config::write_severity(root, severity)?;
    eprintln!("severity = \"{severity}\"");
    return Ok(());
}

/// Point `project`'s map entry at `tag`.
///
/// # Errors
///
/// Returns `Error::UnmappedProject` if no map file lists the project, or
/// I/O errors from rewriting the map file.
pub fn tag(root: &Path, project: &str, tag: &str) -> Result<(), Error> {
    let loaded = load(root)?;
    let Some(file) = loaded.index.map_file_for(project) else {
        return Err(Error::UnmappedProject { name: project.to_string() });
    };
    let path = file.path().to_path_buf();

    let tag = Tag::new(tag);
    if loaded.index.update_entry_tag(&loaded.workspace, project, &tag)? {
        eprintln!("{project} -> {tag} in {}", path.display());
    } else {
        eprintln!("{project} already at {tag}");
    }
    return Ok(());
}

/// Print the tag of each project in input order, `HEAD` for unmapped ones.
///
/// # Errors
///
/// Returns errors from config loading or listing the map folder.
pub fn tags(root: &Path, projects: &[String]) -> Result<(), Error> {
    let loaded = load(root)?;
    let names: Vec<&str> = projects.iter().map(String::as_str).collect();
    for (project, tag) in names.iter().zip(loaded.index.tags_for(&names)) {
        println!("{project} {tag}");
    }
    return Ok(());
}
