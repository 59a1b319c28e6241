//! Change notifications: the record tree delivered for each batch of
//! workspace mutations, and the subscription interface listeners attach to.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::workspace::ResourceKind;

/// What happened to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The resource appeared.
    Added,
    /// The resource still exists but something about it changed.
    Changed,
    /// The resource is gone.
    Removed,
}

/// One node of a change tree. The root record stands for the workspace;
/// children are the affected members one level down.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    /// Affected members one level down.
    pub children: Vec<ChangeRecord>,
    /// For `Changed` records: whether the content (not just metadata) changed.
    pub content: bool,
    /// What happened.
    pub kind: ChangeKind,
    /// For project records: whether the open state flipped.
    pub open: bool,
    /// Workspace-relative path. Empty for the root.
    pub path: PathBuf,
    /// Kind of the affected resource.
    pub resource: ResourceKind,
}

impl ChangeRecord {
    /// Depth-first walk. The visitor returns whether to descend into the
    /// record's children.
    pub fn accept<F>(&self, visitor: &mut F)
    where
        F: FnMut(&Self) -> bool,
    {
        if !visitor(self) {
            return;
        }
        for child in &self.children {
            child.accept(visitor);
        }
    }

    /// The record describing `path`, if that resource is part of this tree.
    pub fn find_member(&self, path: &Path) -> Option<&Self> {
        if self.path == path {
            return Some(self);
        }
        return self
            .children
            .iter()
            .filter(|child| return path.starts_with(&child.path))
            .find_map(|child| return child.find_member(path));
    }

    /// Record a change to a leaf resource, creating `Changed` records for
    /// its project and folders on the way down. A `Changed` leaf counts as a
    /// content change. A second change to the same resource in one batch is
    /// merged into the existing record.
    pub fn insert(&mut self, path: &Path, kind: ChangeKind, resource: ResourceKind) {
        self.insert_change(path, kind, resource, kind == ChangeKind::Changed);
    }

    /// Record a metadata-only change (permissions, timestamps) to a leaf.
    pub fn insert_metadata_change(&mut self, path: &Path, resource: ResourceKind) {
        self.insert_change(path, ChangeKind::Changed, resource, false);
    }

    /// Shared body of the `insert*` methods.
    fn insert_change(&mut self, path: &Path, kind: ChangeKind, resource: ResourceKind, content: bool) {
        let relative = path.strip_prefix(&self.path).unwrap_or(path);
        let Some(first) = relative.components().next() else {
            self.merge(kind, content);
            return;
        };

        let child_path = self.path.join(first);
        let is_leaf = child_path == path;
        let position = self.children.iter().position(|c| return c.path == child_path);
        let index = if let Some(index) = position {
            index
        } else {
            let child_kind = if is_leaf {
                resource
            } else if self.resource == ResourceKind::Root {
                ResourceKind::Project
            } else {
                ResourceKind::Folder
            };
            let (record_kind, record_content) = if is_leaf {
                (kind, content)
            } else {
                (ChangeKind::Changed, false)
            };
            self.children.push(Self {
                children: Vec::new(),
                content: record_content,
                kind: record_kind,
                open: false,
                path: child_path.clone(),
                resource: child_kind,
            });
            self.children.len().saturating_sub(1)
        };

        let Some(child) = self.children.get_mut(index) else {
            return;
        };
        if is_leaf {
            if position.is_some() {
                child.merge(kind, content);
            }
        } else {
            child.insert_change(path, kind, resource, content);
        }
    }

    /// Fold a later change to the same resource into this record. The
    /// content flag of merged `Changed` records is sticky.
    fn merge(&mut self, later: ChangeKind, content: bool) {
        match (self.kind, later) {
            (ChangeKind::Removed, ChangeKind::Added) => {
                self.kind = ChangeKind::Changed;
                self.content = true;
            },
            (ChangeKind::Changed, ChangeKind::Changed) => self.content = self.content || content,
            (ChangeKind::Added, ChangeKind::Removed) | (ChangeKind::Changed, _) => {
                self.kind = later;
                self.content = false;
            },
            _ => {},
        }
    }

    /// Mark the project record at `name` as having flipped its open state.
    pub fn mark_opened(&mut self, name: &str) {
        let path = PathBuf::from(name);
        if let Some(project) = self.children.iter_mut().find(|c| return c.path == path) {
            project.open = true;
            return;
        }
        self.children.push(Self {
            children: Vec::new(),
            content: false,
            kind: ChangeKind::Changed,
            open: true,
            path,
            resource: ResourceKind::Project,
        });
    }

    /// An empty tree rooted at the workspace.
    pub fn root() -> Self {
        return Self {
            children: Vec::new(),
            content: false,
            kind: ChangeKind::Changed,
            open: false,
            path: PathBuf::new(),
            resource: ResourceKind::Root,
        };
    }
}

/// Listeners that can be attached to a change source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    /// The release map index.
    MapIndex,
    /// The POM version checker.
    VersionCheck,
}

/// Attach/detach interface of the change-notification source.
pub trait ChangeSource {
    /// Whether the listener currently receives change batches.
    fn is_subscribed(&self, listener: Listener) -> bool;

    /// Start delivering change batches to the listener.
    fn subscribe(&mut self, listener: Listener);

    /// Stop delivering change batches to the listener.
    fn unsubscribe(&mut self, listener: Listener);
}

/// In-process subscription table consulted by the dispatch loop.
#[derive(Debug, Default)]
pub struct Subscriptions {
    /// Currently attached listeners.
    active: HashSet<Listener>,
}

impl ChangeSource for Subscriptions {
    fn is_subscribed(&self, listener: Listener) -> bool {
        return self.active.contains(&listener);
    }

    fn subscribe(&mut self, listener: Listener) {
        self.active.insert(listener);
    }

    fn unsubscribe(&mut self, listener: Listener) {
        self.active.remove(&listener);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn insert_builds_project_and_folder_records() {
        let mut root = ChangeRecord::root();
        root.insert(Path::new("releng/maps/core.map"), ChangeKind::Changed, ResourceKind::File);

        let project = root.find_member(Path::new("releng")).unwrap();
        assert_eq!(project.resource, ResourceKind::Project);
        let folder = root.find_member(Path::new("releng/maps")).unwrap();
        assert_eq!(folder.resource, ResourceKind::Folder);
        let file = root.find_member(Path::new("releng/maps/core.map")).unwrap();
        assert_eq!(file.kind, ChangeKind::Changed);
        assert!(file.content);
    }

    #[test]
    fn sibling_changes_share_parent_records() {
        let mut root = ChangeRecord::root();
        root.insert(Path::new("p/maps/a.map"), ChangeKind::Added, ResourceKind::File);
        root.insert(Path::new("p/maps/b.map"), ChangeKind::Removed, ResourceKind::File);

        assert_eq!(root.children.len(), 1);
        let folder = root.find_member(Path::new("p/maps")).unwrap();
        assert_eq!(folder.children.len(), 2);
    }

    #[test]
    fn remove_then_add_in_one_batch_is_a_content_change() {
        let mut root = ChangeRecord::root();
        root.insert(Path::new("p/pom.xml"), ChangeKind::Removed, ResourceKind::File);
        root.insert(Path::new("p/pom.xml"), ChangeKind::Added, ResourceKind::File);

        let file = root.find_member(Path::new("p/pom.xml")).unwrap();
        assert_eq!(file.kind, ChangeKind::Changed);
        assert!(file.content);
    }

    #[test]
    fn metadata_changes_carry_no_content_flag() {
        let mut root = ChangeRecord::root();
        root.insert_metadata_change(Path::new("p/maps/a.map"), ResourceKind::File);
        let file = root.find_member(Path::new("p/maps/a.map")).unwrap();
        assert_eq!(file.kind, ChangeKind::Changed);
        assert!(!file.content);

        root.insert(Path::new("p/maps/a.map"), ChangeKind::Changed, ResourceKind::File);
        root.insert_metadata_change(Path::new("p/maps/a.map"), ResourceKind::File);
        assert!(root.find_member(Path::new("p/maps/a.map")).unwrap().content);
    }

    #[test]
    fn visitor_can_prune_subtrees() {
        let mut root = ChangeRecord::root();
        root.insert(Path::new("a/x.txt"), ChangeKind::Added, ResourceKind::File);
        root.insert(Path::new("b/y.txt"), ChangeKind::Added, ResourceKind::File);

        let mut seen = Vec::new();
        root.accept(&mut |record: &ChangeRecord| {
            seen.push(record.path.clone());
            return record.path != Path::new("a");
        });
        assert!(seen.contains(&PathBuf::from("b/y.txt")));
        assert!(!seen.contains(&PathBuf::from("a/x.txt")));
    }

    #[test]
    fn subscriptions_attach_and_detach() {
        let mut subs = Subscriptions::default();
        subs.subscribe(Listener::VersionCheck);
        assert!(subs.is_subscribed(Listener::VersionCheck));
        assert!(!subs.is_subscribed(Listener::MapIndex));
        subs.unsubscribe(Listener::VersionCheck);
        assert!(!subs.is_subscribed(Listener::VersionCheck));
    }
}
