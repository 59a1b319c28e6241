//! POM version checking: compares each project's `pom.xml` version with the
//! `Bundle-Version` of its manifest, and decides when to re-check as the
//! workspace changes.

use std::path::Path;

use crate::change::{ChangeKind, ChangeRecord, ChangeSource, Listener};
use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::locator::{POM_VERSION, locate_field, locate_span};
use crate::manifest::{BUNDLE_VERSION, main_attribute};
use crate::types::{Diagnostic, Location, Severity};
use crate::version::{BundleVersion, Comparison, compare};
use crate::workspace::{ResourceKind, Workspace, project_of};

/// Project-relative path of the POM.
pub const POM_PATH: &str = "pom.xml";

/// Project-relative path of the bundle manifest.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Reported when the span of the declared version cannot be resolved.
const FALLBACK_LOCATION: Location = Location { char_end: 0, char_start: 0, line: 1 };

/// Checks POM versions against bundle manifests.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    /// Nature a project must declare to be checked on change.
    nature: String,
    /// Current reporting severity.
    severity: Severity,
}

impl ValidationEngine {
    /// Start receiving change batches, unless checking is switched off.
    pub fn attach(&self, source: &mut dyn ChangeSource) {
        if self.severity != Severity::Ignore {
            source.subscribe(Listener::VersionCheck);
        }
    }

    /// Stop receiving change batches.
    pub fn detach(source: &mut dyn ChangeSource) {
        source.unsubscribe(Listener::VersionCheck);
    }

    /// Compare the project's POM and manifest versions. `None` when the
    /// versions agree or when anything needed for the comparison is missing.
    fn find_mismatch(&self, workspace: &dyn Workspace, project: &str) -> Option<Diagnostic> {
        let manifest_path = Path::new(project).join(MANIFEST_PATH);
        let pom_path = Path::new(project).join(POM_PATH);
        if !workspace.exists(&manifest_path) || !workspace.exists(&pom_path) {
            return None;
        }

        let manifest = read_logged(workspace, &manifest_path)?;
        let bundle_version = BundleVersion::parse(&main_attribute(&manifest, BUNDLE_VERSION)?)?;

        let pom = read_logged(workspace, &pom_path)?;
        let declared = match locate_field(&pom, POM_VERSION) {
            Err(e) => {
                tracing::debug!("skipping unparsable {}: {e}", pom_path.display());
                return None;
            },
            Ok(found) => found?,
        };

        let Comparison::Mismatch { corrected, declared: found, expected } =
            compare(&bundle_version, &declared.value)
        else {
            return None;
        };

        let location =
            locate_span(&pom, declared.line, &declared.value).unwrap_or(FALLBACK_LOCATION);
        return Some(Diagnostic {
            corrected_version: corrected,
            location,
            message: format!("POM version {found} does not match the bundle version {expected}"),
            severity: self.severity,
            subject: pom_path,
        });
    }

    /// Engine configured from the workspace config.
    pub fn new(config: &Config) -> Self {
        return Self { nature: config.nature.clone(), severity: config.severity };
    }

    /// React to one change batch. Qualifying projects whose open state
    /// flipped are validated whole; otherwise only POM and manifest
    /// additions and content changes trigger a re-check. Removing the
    /// manifest, the POM or the whole project only clears diagnostics.
    pub fn resource_changed(
        &self,
        workspace: &dyn Workspace,
        sink: &mut dyn DiagnosticSink,
        root: &ChangeRecord,
    ) {
        root.accept(&mut |record: &ChangeRecord| return self.visit(workspace, sink, record));
    }

    /// Current reporting severity.
    pub const fn severity(&self) -> Severity {
        return self.severity;
    }

    /// Apply a new severity setting. Switching to `Ignore` detaches from
    /// change notifications and leaves existing diagnostics alone; any
    /// other change re-validates every project.
    pub fn severity_changed(
        &mut self,
        workspace: &dyn Workspace,
        sink: &mut dyn DiagnosticSink,
        source: &mut dyn ChangeSource,
        severity: Severity,
    ) {
        let previous = self.severity;
        self.severity = severity;
        if previous == severity {
            return;
        }
        tracing::info!("pom version severity changed from {previous} to {severity}");

        if severity == Severity::Ignore {
            Self::detach(source);
            return;
        }
        if previous == Severity::Ignore {
            source.subscribe(Listener::VersionCheck);
        }
        self.validate_all(workspace, sink);
    }

    /// Clear and re-check one project. Inaccessible projects are skipped.
    pub fn validate(&self, workspace: &dyn Workspace, sink: &mut dyn DiagnosticSink, project: &str) {
        if !workspace.is_accessible(project) {
            return;
        }
        sink.clear(Path::new(project));
        if self.severity == Severity::Ignore {
            return;
        }

        if let Some(diagnostic) = self.find_mismatch(workspace, project) {
            tracing::debug!("{}: {}", diagnostic.subject.display(), diagnostic.message);
            if let Err(e) = sink.create(diagnostic) {
                tracing::warn!("failed to record diagnostic for {project}: {e}");
            }
        }
    }

    /// Validate every project in the workspace.
    pub fn validate_all(&self, workspace: &dyn Workspace, sink: &mut dyn DiagnosticSink) {
        let projects = match workspace.projects() {
            Err(e) => {
                tracing::warn!("failed to list workspace projects: {e}");
                return;
            },
            Ok(p) => p,
        };
        for project in &projects {
            self.validate(workspace, sink, project);
        }
    }

    /// Handle one record of a change tree; returns whether to descend.
    fn visit(
        &self,
        workspace: &dyn Workspace,
        sink: &mut dyn DiagnosticSink,
        record: &ChangeRecord,
    ) -> bool {
        let Some(project) = project_of(&record.path) else {
            return record.resource == ResourceKind::Root;
        };

        match record.resource {
            ResourceKind::File => {},
            ResourceKind::Folder | ResourceKind::Root => return true,
            ResourceKind::Project if record.kind == ChangeKind::Removed => {
                sink.clear(Path::new(project));
                return false;
            },
            ResourceKind::Project => {
                return match workspace.has_nature(project, &self.nature) {
                    Err(e) => {
                        tracing::warn!("failed to read project description of {project}: {e}");
                        false
                    },
                    Ok(false) => false,
                    Ok(true) if record.open => {
                        self.validate(workspace, sink, project);
                        false
                    },
                    Ok(true) => true,
                };
            },
        }

        let relative = record.path.strip_prefix(project).unwrap_or(record.path.as_path());
        let is_manifest = relative == Path::new(MANIFEST_PATH);
        let is_pom = relative == Path::new(POM_PATH);
        match record.kind {
            ChangeKind::Added if is_manifest || is_pom => self.validate(workspace, sink, project),
            ChangeKind::Changed if record.content && (is_manifest || is_pom) => {
                self.validate(workspace, sink, project);
            },
            ChangeKind::Removed if is_manifest && workspace.is_accessible(project) => {
                sink.clear(Path::new(project));
            },
            ChangeKind::Removed if is_pom => sink.clear(&record.path),
            _ => {},
        }
        return false;
    }
}

/// Read a file, logging failures.
fn read_logged(workspace: &dyn Workspace, path: &Path) -> Option<String> {
    return match workspace.read(path) {
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            None
        },
        Ok(content) => Some(content),
    };
}
