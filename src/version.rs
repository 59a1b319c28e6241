//! Bundle version parsing and the manifest-versus-POM comparison.
//!
//! Bundle versions have the form `major[.minor[.micro[.qualifier]]]`.
//! Only the numeric release triple takes part in comparisons; qualifiers
//! and the Maven `-SNAPSHOT` suffix are ignored.

use semver::Version;

/// Maven suffix marking a development version.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// A parsed bundle version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleVersion {
    /// Numeric `major.minor.micro` part.
    release: Version,
    /// Free-form qualifier after the third dot, if any.
    qualifier: Option<String>,
}

impl BundleVersion {
    /// Parse `major[.minor[.micro[.qualifier]]]`. Missing numeric parts
    /// default to zero. Returns `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut parts = text.splitn(4, '.');
        let major = parse_component(parts.next())?;
        let minor = parse_component(parts.next())?;
        let micro = parse_component(parts.next())?;
        let qualifier = match parts.next() {
            None => None,
            Some(q) if is_valid_qualifier(q) => Some(q.to_string()),
            Some(_) => return None,
        };

        return Some(Self { release: Version::new(major, minor, micro), qualifier });
    }

    /// The qualifier, if the version carries one.
    pub fn qualifier(&self) -> Option<&str> {
        return self.qualifier.as_deref();
    }

    /// The numeric release triple with the qualifier dropped.
    pub const fn release(&self) -> &Version {
        return &self.release;
    }
}

/// Parse one numeric component. An absent component counts as zero.
fn parse_component(part: Option<&str>) -> Option<u64> {
    let Some(part) = part else {
        return Some(0);
    };
    if part.is_empty() || !part.bytes().all(|b| return b.is_ascii_digit()) {
        return None;
    }
    return part.parse().ok();
}

/// Qualifiers are non-empty runs of letters, digits, `_` and `-`.
fn is_valid_qualifier(qualifier: &str) -> bool {
    return !qualifier.is_empty()
        && qualifier.chars().all(|c| return c.is_ascii_alphanumeric() || c == '_' || c == '-');
}

/// Outcome of comparing a declared POM version against the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Release triples agree.
    Equal,
    /// Release triples differ.
    Mismatch {
        /// Manifest version with the declared suffix re-appended.
        corrected: String,
        /// Release triple of the declared version.
        declared: Version,
        /// Release triple of the manifest version.
        expected: Version,
    },
    /// The declared text is not a version. Nothing is reported for it.
    Unparsable,
}

/// Compare the POM's declared version text against the manifest version.
pub fn compare(manifest: &BundleVersion, declared: &str) -> Comparison {
    let snapshot_at = declared.find(SNAPSHOT_SUFFIX);
    let stripped = match snapshot_at {
        Some(index) => declared.get(..index).unwrap_or(declared),
        None => declared,
    };
    let Some(declared_version) = BundleVersion::parse(stripped) else {
        return Comparison::Unparsable;
    };

    let expected = manifest.release().clone();
    let found = declared_version.release().clone();
    if expected == found {
        return Comparison::Equal;
    }

    let mut corrected = expected.to_string();
    if snapshot_at.is_some() {
        corrected.push_str(SNAPSHOT_SUFFIX);
    }
    return Comparison::Mismatch { corrected, declared: found, expected };
}
