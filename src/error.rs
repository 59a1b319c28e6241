/// Crate-level error types for relmap.
use std::path::PathBuf;

/// All errors in relmap carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, project, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-wide error type re-exported as relmap::Error")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A version-control commit failed for a reason other than cancellation.
    #[error("commit failed: {reason}")]
    CommitFailed {
        /// Description of the failure, usually the tool's stderr.
        reason: String,
    },

    /// The configuration file could not be parsed or edited.
    #[error("config invalid: {}: {reason}", path.display())]
    ConfigInvalid {
        /// Path to the offending config file.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// A resource the operation depends on does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Workspace-relative path to the missing resource.
        path: PathBuf,
    },

    /// The operation was cancelled through its cancellation token.
    #[error("interrupted")]
    Interrupted,

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of diagnostics failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A document could not be parsed into the structure an operation needs.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The named project does not exist in the workspace.
    #[error("project not found: `{name}`")]
    ProjectNotFound {
        /// Project name that was looked up.
        name: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No map file has an entry for the named project.
    #[error("project `{name}` is not listed in any map file")]
    UnmappedProject {
        /// Project name that was looked up.
        name: String,
    },

    /// The filesystem watcher could not be created or attached.
    #[error("watch failed: {reason}")]
    WatchFailed {
        /// Description of the watcher failure.
        reason: String,
    },

    /// The XML tokenizer rejected a document.
    #[error("xml: {0}")]
    Xml(
        /// The wrapped tokenizer error.
        #[from]
        quick_xml::Error,
    ),
}
