//! File watcher: checks once on startup, then turns filesystem events into
//! change batches for the map index and the version checker.

use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecursiveMode, Watcher as _};

use crate::change::{ChangeKind, ChangeRecord, ChangeSource, Listener, Subscriptions};
use crate::config::{CONFIG_FILE, Config};
use crate::diagnostics::{self, DiagnosticStore};
use crate::error::Error;
use crate::mapindex::MapIndex;
use crate::validation::ValidationEngine;
use crate::workspace::{FsWorkspace, ResourceKind, Workspace as _};

/// Debounce delay between filesystem events and dispatch.
const DEBOUNCE_MS: u64 = 100;

/// One debounced batch of filesystem events, as seen by listeners.
#[derive(Debug)]
pub struct Batch {
    /// Whether `.relmap.toml` was touched.
    pub config_changed: bool,
    /// Change tree rooted at the workspace.
    pub root: ChangeRecord,
}

impl Batch {
    /// Whether the batch carries no resource changes.
    pub fn is_empty(&self) -> bool {
        return self.root.children.is_empty();
    }

    /// Fold one filesystem event into the batch. `root` must be the
    /// canonical workspace root, since notify reports absolute paths.
    pub fn record(&mut self, root: &Path, event: &notify::Event) {
        if let EventKind::Modify(ModifyKind::Metadata(_)) = event.kind {
            for path in &event.paths {
                self.record_path(root, path, ChangeKind::Changed, false);
            }
            return;
        }

        let changes: Vec<(&PathBuf, ChangeKind)> = match event.kind {
            EventKind::Create(_) => event.paths.iter().map(|p| return (p, ChangeKind::Added)).collect(),
            EventKind::Remove(_) => event.paths.iter().map(|p| return (p, ChangeKind::Removed)).collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                event.paths.iter().map(|p| return (p, ChangeKind::Removed)).collect()
            },
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                event.paths.iter().map(|p| return (p, ChangeKind::Added)).collect()
            },
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                let mut paths = event.paths.iter();
                paths
                    .next()
                    .map(|p| return (p, ChangeKind::Removed))
                    .into_iter()
                    .chain(paths.map(|p| return (p, ChangeKind::Added)))
                    .collect()
            },
            EventKind::Modify(ModifyKind::Name(_)) => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() { ChangeKind::Added } else { ChangeKind::Removed };
                    return (p, kind);
                })
                .collect(),
            EventKind::Modify(_) => event.paths.iter().map(|p| return (p, ChangeKind::Changed)).collect(),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
        };

        for (path, kind) in changes {
            self.record_path(root, path, kind, kind == ChangeKind::Changed);
        }
    }

    /// Fold one path-level change into the batch. Plain files at the
    /// workspace root belong to no project and are dropped; a vanished
    /// top-level path is taken to be a project, since project names
    /// usually contain dots.
    fn record_path(&mut self, root: &Path, path: &Path, kind: ChangeKind, content: bool) {
        let Ok(relative) = path.strip_prefix(root) else {
            return;
        };
        if relative == Path::new(CONFIG_FILE) {
            self.config_changed = true;
            return;
        }
        if is_hidden(relative) {
            return;
        }

        let top_level = relative.components().count() == 1;
        if top_level && path.is_file() {
            return;
        }
        let resource = if top_level { ResourceKind::Project } else { resource_kind(path) };
        if content || kind != ChangeKind::Changed {
            self.root.insert(relative, kind, resource);
        } else {
            self.root.insert_metadata_change(relative, resource);
        }
        if top_level
            && kind == ChangeKind::Added
            && let Some(name) = relative.to_str()
        {
            self.root.mark_opened(name);
        }
    }
}

impl Default for Batch {
    fn default() -> Self {
        return Self { config_changed: false, root: ChangeRecord::root() };
    }
}

/// Long-lived state of a watch session.
struct Session {
    /// Parsed configuration.
    config: Config,
    /// Version checker.
    engine: ValidationEngine,
    /// Release map index.
    index: MapIndex,
    /// Current diagnostics.
    store: DiagnosticStore,
    /// Which listeners receive change batches.
    subscriptions: Subscriptions,
    /// Workspace being watched.
    workspace: FsWorkspace,
}

impl Session {
    /// Deliver one batch to the subscribed listeners.
    fn dispatch(&mut self, batch: &Batch) {
        if batch.config_changed {
            self.reload_config();
        }
        if batch.is_empty() {
            return;
        }
        if self.subscriptions.is_subscribed(Listener::MapIndex) {
            self.index.apply_change(&self.workspace, &batch.root);
        }
        if self.subscriptions.is_subscribed(Listener::VersionCheck) {
            self.engine.resource_changed(&self.workspace, &mut self.store, &batch.root);
        }
    }

    /// Load the workspace, index its maps and check every project.
    ///
    /// # Errors
    ///
    /// Returns errors from config loading or the initial map load.
    fn open(root: &Path) -> Result<Self, Error> {
        let config = Config::load(root)?;
        let workspace = FsWorkspace::new(root);
        let index = MapIndex::new(&workspace, &config.map_project, &config.map_folder)?;
        let engine = ValidationEngine::new(&config);

        let mut subscriptions = Subscriptions::default();
        subscriptions.subscribe(Listener::MapIndex);
        engine.attach(&mut subscriptions);

        let mut store = DiagnosticStore::default();
        engine.validate_all(&workspace, &mut store);
        return Ok(Self { config, engine, index, store, subscriptions, workspace });
    }

    /// Re-read `.relmap.toml` and apply a changed severity. Map location
    /// changes take effect on the next start.
    fn reload_config(&mut self) {
        let config = match Config::load(self.workspace.root()) {
            Err(e) => {
                tracing::warn!("keeping previous config: {e}");
                return;
            },
            Ok(c) => c,
        };
        if config.map_project != self.config.map_project || config.map_folder != self.config.map_folder {
            tracing::warn!("map location changed in {CONFIG_FILE}; restart to apply");
        }
        self.engine
            .severity_changed(&self.workspace, &mut self.store, &mut self.subscriptions, config.severity);
        self.config = config;
    }

    /// Print current diagnostics.
    fn report(&self, format: &str) -> ExitCode {
        match diagnostics::render_all(&self.store, format) {
            Err(e) => {
                diagnostics::print_error(&e);
                return ExitCode::from(2_u8);
            },
            Ok(out) => print!("{out}"),
        }
        tracing::debug!("{} map file(s) indexed", self.index.files().count());
        return if self.store.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE };
    }
}

/// Create a filesystem watcher that forwards events on the given channel.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<notify::Event>) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        match res {
            Err(e) => tracing::warn!("watch error: {e}"),
            Ok(event) => {
                let _ = tx.send(event);
            },
        }
    })
    .map_err(|e| return Error::WatchFailed { reason: format!("watcher setup failed: {e}") });
}

/// Whether any component of a workspace-relative path is hidden.
fn is_hidden(relative: &Path) -> bool {
    return relative.components().any(|c| {
        return matches!(c, Component::Normal(name) if name.to_string_lossy().starts_with('.'));
    });
}

/// Kind of a changed resource below project level. Removed paths can no
/// longer be inspected, so anything with an extension counts as a file.
fn resource_kind(path: &Path) -> ResourceKind {
    if path.is_dir() {
        return ResourceKind::Folder;
    }
    if path.exists() || path.extension().is_some() {
        return ResourceKind::File;
    }
    return ResourceKind::Folder;
}

/// Entry point for the watch command.
///
/// Checks every project, then watches the workspace and reacts to changes
/// until the event channel closes.
///
/// # Errors
///
/// Returns errors from config loading, the initial map load, or watcher setup.
pub fn run(root: &Path, format: &str) -> Result<ExitCode, Error> {
    let root = std::fs::canonicalize(root)?;
    let mut session = Session::open(&root)?;
    eprintln!("watch: initial check");
    let mut last_code = session.report(format);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| return Error::WatchFailed { reason: e.to_string() })?;
    eprintln!("watch: monitoring {}, press Ctrl+C to stop", root.display());

    let debounce = Duration::from_millis(DEBOUNCE_MS);
    while let Ok(first) = rx.recv() {
        let mut batch = Batch::default();
        batch.record(&root, &first);
        while let Ok(event) = rx.recv_timeout(debounce) {
            batch.record(&root, &event);
        }
        if batch.is_empty() && !batch.config_changed {
            continue;
        }

        eprintln!("watch: change detected, re-checking...");
        session.dispatch(&batch);
        last_code = session.report(format);
    }

    return Ok(last_code);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "tests")]
mod tests {
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    use super::*;

    fn event(kind: EventKind, paths: &[&Path]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for path in paths {
            event = event.add_path(path.to_path_buf());
        }
        return event;
    }

    #[test]
    fn content_edits_become_changed_file_records() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("releng/maps")).unwrap();
        std::fs::write(root.join("releng/maps/a.map"), "").unwrap();

        let mut batch = Batch::default();
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        batch.record(root, &event(kind, &[&root.join("releng/maps/a.map")]));

        let record = batch.root.find_member(Path::new("releng/maps/a.map")).unwrap();
        assert_eq!(record.kind, ChangeKind::Changed);
        assert!(record.content);
        assert_eq!(record.resource, ResourceKind::File);
        let folder = batch.root.find_member(Path::new("releng/maps")).unwrap();
        assert_eq!(folder.resource, ResourceKind::Folder);
    }

    #[test]
    fn metadata_edits_are_not_content_changes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("r/maps")).unwrap();
        std::fs::write(root.join("r/maps/a.map"), "").unwrap();

        let mut batch = Batch::default();
        let kind = EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions));
        batch.record(root, &event(kind, &[&root.join("r/maps/a.map")]));

        let record = batch.root.find_member(Path::new("r/maps/a.map")).unwrap();
        assert_eq!(record.kind, ChangeKind::Changed);
        assert!(!record.content);
    }

    #[test]
    fn top_level_files_are_not_projects() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("README.md"), "").unwrap();

        let mut batch = Batch::default();
        batch.record(root, &event(EventKind::Create(CreateKind::File), &[&root.join("README.md")]));
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        batch.record(root, &event(kind, &[&root.join("README.md")]));
        assert!(batch.is_empty());

        batch.record(root, &event(EventKind::Remove(RemoveKind::Folder), &[&root.join("org.eclipse.gone")]));
        let project = batch.root.find_member(Path::new("org.eclipse.gone")).unwrap();
        assert_eq!(project.resource, ResourceKind::Project);
        assert_eq!(project.kind, ChangeKind::Removed);
    }

    #[test]
    fn removed_paths_guess_kind_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut batch = Batch::default();
        let kind = EventKind::Remove(RemoveKind::Any);
        batch.record(root, &event(kind, &[&root.join("p/META-INF/MANIFEST.MF"), &root.join("p/gone")]));

        let file = batch.root.find_member(Path::new("p/META-INF/MANIFEST.MF")).unwrap();
        assert_eq!(file.resource, ResourceKind::File);
        assert_eq!(file.kind, ChangeKind::Removed);
        let folder = batch.root.find_member(Path::new("p/gone")).unwrap();
        assert_eq!(folder.resource, ResourceKind::Folder);
    }

    #[test]
    fn new_top_level_directory_is_an_opened_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir(root.join("org.eclipse.foo")).unwrap();

        let mut batch = Batch::default();
        batch.record(root, &event(EventKind::Create(CreateKind::Folder), &[&root.join("org.eclipse.foo")]));

        let project = batch.root.find_member(Path::new("org.eclipse.foo")).unwrap();
        assert_eq!(project.resource, ResourceKind::Project);
        assert!(project.open);
    }

    #[test]
    fn rename_pairs_remove_then_add() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut batch = Batch::default();
        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::Both));
        batch.record(root, &event(kind, &[&root.join("r/maps/old.map"), &root.join("r/maps/new.map")]));

        assert_eq!(batch.root.find_member(Path::new("r/maps/old.map")).unwrap().kind, ChangeKind::Removed);
        assert_eq!(batch.root.find_member(Path::new("r/maps/new.map")).unwrap().kind, ChangeKind::Added);
    }

    #[test]
    fn config_and_hidden_paths_are_not_resources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut batch = Batch::default();
        let kind = EventKind::Modify(ModifyKind::Any);
        batch.record(root, &event(kind, &[&root.join(CONFIG_FILE), &root.join(".git/index"), &root.join("p/.project")]));

        assert!(batch.config_changed);
        assert!(batch.is_empty());
    }

    #[test]
    fn access_events_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut batch = Batch::default();
        batch.record(root, &event(EventKind::Access(notify::event::AccessKind::Any), &[&root.join("p/pom.xml")]));
        assert!(batch.is_empty());
    }

    #[test]
    fn session_dispatches_to_subscribed_listeners() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("org.eclipse.releng/maps")).unwrap();
        std::fs::write(root.join("org.eclipse.releng/maps/a.map"), "plugin@org.x=v1\n").unwrap();

        let mut session = Session::open(root).unwrap();
        assert_eq!(session.index.map_entry_for("org.x").unwrap().tag.name(), "v1");

        std::fs::write(root.join("org.eclipse.releng/maps/a.map"), "plugin@org.x=v2\n").unwrap();
        let mut batch = Batch::default();
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        batch.record(root, &event(kind, &[&root.join("org.eclipse.releng/maps/a.map")]));
        session.dispatch(&batch);
        assert_eq!(session.index.map_entry_for("org.x").unwrap().tag.name(), "v2");
    }

    #[test]
    fn config_change_to_ignore_detaches_version_check() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut session = Session::open(root).unwrap();
        assert!(session.subscriptions.is_subscribed(Listener::VersionCheck));

        std::fs::write(root.join(CONFIG_FILE), "severity = \"ignore\"\n").unwrap();
        let batch = Batch { config_changed: true, root: ChangeRecord::root() };
        session.dispatch(&batch);
        assert!(!session.subscriptions.is_subscribed(Listener::VersionCheck));
        assert!(session.subscriptions.is_subscribed(Listener::MapIndex));
    }
}
