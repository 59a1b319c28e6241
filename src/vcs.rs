//! Version-control collaborator: committing workspace resources.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;

/// Shared flag a caller sets to cancel a running operation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Set once cancellation is requested.
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        return self.cancelled.load(Ordering::SeqCst);
    }
}

/// Commits a set of workspace resources.
pub trait VersionControl {
    /// Commit `resources` (workspace-relative) with `message`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Interrupted` if `cancel` fired, or `Error::CommitFailed`.
    fn commit(&self, resources: &[PathBuf], message: &str, cancel: &CancellationToken) -> Result<(), Error>;
}

/// Commits through the `git` command line in the workspace root.
#[derive(Debug, Clone)]
pub struct GitCli {
    /// Directory `git` runs in.
    root: PathBuf,
}

impl GitCli {
    /// A committer for the repository containing `root`.
    pub fn new(root: &Path) -> Self {
        return Self { root: root.to_path_buf() };
    }
}

impl VersionControl for GitCli {
    fn commit(&self, resources: &[PathBuf], message: &str, cancel: &CancellationToken) -> Result<(), Error> {
        if cancel.is_cancelled() {
            return Err(Error::Interrupted);
        }

        let output = Command::new("git")
            .current_dir(&self.root)
            .arg("commit")
            .arg("-m")
            .arg(message)
            .arg("--")
            .args(resources)
            .output()
            .map_err(|e| return Error::CommitFailed { reason: format!("cannot run git: {e}") })?;

        if cancel.is_cancelled() {
            return Err(Error::Interrupted);
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let reason = if stderr.is_empty() { stdout } else { stderr };
            return Err(Error::CommitFailed { reason });
        }
        tracing::info!("committed {} resource(s)", resources.len());
        return Ok(());
    }
}
