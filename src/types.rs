/// Core domain types shared by the map index and the version checker.
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A version-control label naming a line of history for a project.
/// Equality is by label text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(
    /// The label text as written in the map file.
    String,
);

impl Tag {
    /// Label of the default tag, used when a project has no map entry.
    pub const DEFAULT_NAME: &'static str = "HEAD";

    /// The default tag ("latest"/trunk).
    pub fn default_tag() -> Self {
        return Self(Self::DEFAULT_NAME.to_string());
    }

    /// Whether this is the default tag.
    pub fn is_default(&self) -> bool {
        return self.0 == Self::DEFAULT_NAME;
    }

    /// The label text.
    pub fn name(&self) -> &str {
        return &self.0;
    }

    /// Build a tag from label text. An empty label maps to the default tag.
    pub fn new(name: &str) -> Self {
        if name.is_empty() {
            return Self::default_tag();
        }
        return Self(name.to_string());
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

/// One `project=tag` association parsed from a map file line.
/// Two entries are equal when they name the same project.
#[derive(Debug, Clone)]
pub struct MapEntry {
    /// Project identifier, without any `kind@` prefix.
    pub project: String,
    /// Tag the project is released under.
    pub tag: Tag,
}

impl PartialEq for MapEntry {
    fn eq(&self, other: &Self) -> bool {
        return self.project == other.project;
    }
}

impl Eq for MapEntry {}

/// How version mismatches are reported. `Ignore` switches the check off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Report mismatches as errors.
    Error,
    /// Do not check at all.
    Ignore,
    /// Report mismatches as warnings.
    #[default]
    Warning,
}

impl Severity {
    /// Parse a configuration value (`ignore`, `warning`, `error`).
    pub fn parse(value: &str) -> Option<Self> {
        return match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "ignore" => Some(Self::Ignore),
            "warning" => Some(Self::Warning),
            _ => None,
        };
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Error => "error",
            Self::Ignore => "ignore",
            Self::Warning => "warning",
        };
        return f.write_str(label);
    }
}

/// Position of a reported problem. Offsets are document-relative character
/// offsets, `char_end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Exclusive end offset.
    pub char_end: usize,
    /// Inclusive start offset.
    pub char_start: usize,
    /// One-based line number.
    pub line: usize,
}

/// A located, severity-tagged report of a version mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Version text that should replace the declared one.
    pub corrected_version: String,
    /// Where the mismatching value sits in the subject file.
    pub location: Location,
    /// Human-readable description of the mismatch.
    pub message: String,
    /// Reported severity. Never `Ignore`.
    pub severity: Severity,
    /// Workspace-relative path of the file the diagnostic is attached to.
    pub subject: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_label_is_default_tag() {
        assert!(Tag::new("").is_default());
        assert_eq!(Tag::new("v20130101").name(), "v20130101");
    }

    #[test]
    fn entries_compare_by_project_only() {
        let a = MapEntry { project: "org.foo".to_string(), tag: Tag::new("v1") };
        let b = MapEntry { project: "org.foo".to_string(), tag: Tag::new("v2") };
        assert_eq!(a, b);
    }

    #[test]
    fn severity_parses_config_values() {
        assert_eq!(Severity::parse("Warning"), Some(Severity::Warning));
        assert_eq!(Severity::parse("ignore"), Some(Severity::Ignore));
        assert_eq!(Severity::parse("fatal"), None);
    }
}
