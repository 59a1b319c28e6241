use std::path::Path;

use crate::error::Error;
use crate::types::Severity;

/// Name of the configuration file at the workspace root.
pub const CONFIG_FILE: &str = ".relmap.toml";

/// Default project holding the release maps.
const DEFAULT_MAP_PROJECT: &str = "org.eclipse.releng";

/// Default folder inside the map project.
const DEFAULT_MAP_FOLDER: &str = "maps";

/// Default nature a project must declare to be version-checked.
const DEFAULT_NATURE: &str = "org.eclipse.pde.PluginNature";

/// Workspace configuration loaded from `.relmap.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Folder inside the map project that holds the map documents.
    pub map_folder: String,
    /// Project holding the release maps.
    pub map_project: String,
    /// Nature a project must declare to be version-checked.
    pub nature: String,
    /// How POM version mismatches are reported.
    pub severity: Severity,
}

/// Raw TOML structure for `.relmap.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RelmapTomlConfig {
    /// See [`Config::map_folder`].
    map_folder: Option<String>,
    /// See [`Config::map_project`].
    map_project: Option<String>,
    /// See [`Config::nature`].
    nature: Option<String>,
    /// See [`Config::severity`].
    severity: Option<Severity>,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            map_folder: DEFAULT_MAP_FOLDER.to_string(),
            map_project: DEFAULT_MAP_PROJECT.to_string(),
            nature: DEFAULT_NATURE.to_string(),
            severity: Severity::default(),
        };
    }
}

impl Config {
    /// Load config from `.relmap.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist.
    /// A file that exists but is malformed is an error, never a silent
    /// fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        let raw: RelmapTomlConfig = toml::from_str(&content)?;
        let defaults = Self::default();
        return Ok(Self {
            map_folder: raw.map_folder.unwrap_or(defaults.map_folder),
            map_project: raw.map_project.unwrap_or(defaults.map_project),
            nature: raw.nature.unwrap_or(defaults.nature),
            severity: raw.severity.unwrap_or(defaults.severity),
        });
    }
}

/// Set `severity` in `.relmap.toml`, keeping the rest of the file's
/// formatting. Creates the file if needed.
///
/// # Errors
///
/// Returns `Error::ConfigInvalid` if the existing file isn't valid TOML,
/// or `Error::Io` if reading or writing fails.
pub fn write_severity(root: &Path, severity: Severity) -> Result<(), Error> {
    let path = root.join(CONFIG_FILE);
    let content = match std::fs::read_to_string(&path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };

    let mut doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        return Error::ConfigInvalid { path: path.clone(), reason: e.to_string() };
    })?;
    doc["severity"] = toml_edit::value(severity.to_string());

    std::fs::write(&path, doc.to_string())?;
    return Ok(());
}
