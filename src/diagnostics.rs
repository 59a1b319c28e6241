//! Diagnostic sink and rendering of diagnostics and errors for the terminal.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::{Diagnostic, Severity};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Where the version checker puts its diagnostics.
pub trait DiagnosticSink {
    /// Remove every diagnostic whose subject is `subject` or lies below it.
    fn clear(&mut self, subject: &Path);

    /// Record a diagnostic.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot store the diagnostic.
    fn create(&mut self, diagnostic: Diagnostic) -> Result<(), Error>;
}

/// In-memory diagnostic storage, keyed by subject path.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    /// Diagnostics per subject file.
    by_subject: BTreeMap<PathBuf, Vec<Diagnostic>>,
}

impl DiagnosticStore {
    /// All diagnostics, ordered by subject path.
    pub fn all(&self) -> impl Iterator<Item = &Diagnostic> {
        return self.by_subject.values().flatten();
    }

    /// Diagnostics attached to exactly `subject`.
    pub fn for_subject(&self, subject: &Path) -> &[Diagnostic] {
        return self.by_subject.get(subject).map(Vec::as_slice).unwrap_or_default();
    }

    /// Whether nothing is reported.
    pub fn is_empty(&self) -> bool {
        return self.by_subject.is_empty();
    }

    /// Total number of diagnostics.
    pub fn len(&self) -> usize {
        return self.by_subject.values().map(Vec::len).sum();
    }
}

impl DiagnosticSink for DiagnosticStore {
    fn clear(&mut self, subject: &Path) {
        self.by_subject.retain(|path, _| return !path.starts_with(subject));
    }

    fn create(&mut self, diagnostic: Diagnostic) -> Result<(), Error> {
        self.by_subject.entry(diagnostic.subject.clone()).or_default().push(diagnostic);
        return Ok(());
    }
}

/// One-line rendering: `path:line:start-end: severity: message (expected X)`.
pub fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    let location = &diagnostic.location;
    return format!(
        "{}:{}:{}-{}: {}: {} (expected {})",
        diagnostic.subject.display(),
        location.line,
        location.char_start,
        location.char_end,
        diagnostic.severity,
        diagnostic.message,
        diagnostic.corrected_version,
    );
}

/// Render all diagnostics in `format` (`text` or `json`).
///
/// # Errors
///
/// Returns `Error::Json` if JSON serialization fails.
pub fn render_all(store: &DiagnosticStore, format: &str) -> Result<String, Error> {
    if format == "json" {
        let all: Vec<&Diagnostic> = store.all().collect();
        return Ok(serde_json::to_string_pretty(&all)?);
    }

    let mut out = String::new();
    for diagnostic in store.all() {
        let _ = writeln!(out, "{}", render_diagnostic(diagnostic));
    }
    let errors = store.all().filter(|d| return d.severity == Severity::Error).count();
    let warnings = store.len().saturating_sub(errors);
    if store.is_empty() {
        out.push_str("All POM versions match their manifests\n");
    } else {
        let _ = writeln!(out, "{errors} error(s), {warnings} warning(s)");
    }
    return Ok(out);
}

/// Render an error as markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a markdown block saying what happened and how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigInvalid { path, reason } => format!("\
# Error: Invalid Config

`{}`: {reason}

## Fix

Valid severities are `ignore`, `warning` and `error`.
", path.display()),

        Error::ProjectNotFound { name } => format!("\
# Error: Project Not Found

No project named `{name}` exists in the workspace.
"),

        Error::UnmappedProject { name } => format!("\
# Error: Unmapped Project

`{name}` is not listed in any map file.

## Fix

Add a line to a map file in the map folder:

    plugin@{name}=<tag>
"),

        Error::CommitFailed { reason } => format!("\
# Error: Commit Failed

{reason}
"),

        Error::TomlDe(err) => format!("\
# Error: Invalid TOML

{err}
"),

        _ => format!("\
# Error

{e}
"),
    };
}
