//! Isolated temporary workspace lifecycle.
//!
//! Every run installs and builds inside a scratch directory under the
//! platform temp dir. The workspace is created with its `src` subfolder in
//! one step (no partial state) and released exactly once at the end of the
//! run, on both success and failure paths.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

/// Errors that can occur managing a workspace.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// The platform temp directory is unwritable or directory creation failed.
    #[error("Failed to create workspace: {0}")]
    CreateFailed(#[source] io::Error),

    /// Removing the workspace tree failed.
    #[error("Failed to remove workspace: {0}")]
    RemoveFailed(#[source] io::Error),
}

/// What to do with the workspace directory when the run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Recursively delete the directory tree.
    AutoDelete,
    /// Leave the directory in place and report its path for inspection.
    Preserve,
}

/// An exclusively owned scratch directory for one measurement run.
///
/// Dropping a workspace without calling [`Workspace::release`] falls back to
/// best-effort deletion under the auto-delete policy.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    policy: CleanupPolicy,
}

impl Workspace {
    /// Creates a fresh workspace with its `src` subdirectory.
    ///
    /// Fails if the platform temp directory is unwritable; on failure no
    /// partial directory is left behind and no further pipeline steps run.
    pub fn acquire(policy: CleanupPolicy) -> Result<Self, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix("packscope-")
            .tempdir()
            .map_err(WorkspaceError::CreateFailed)?;
        fs::create_dir(dir.path().join("src")).map_err(WorkspaceError::CreateFailed)?;

        let root = dir.path().to_path_buf();
        debug!(path = %root.display(), "workspace acquired");

        Ok(Self {
            dir: Some(dir),
            root,
            policy,
        })
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory for generated re-export entry files.
    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// The installed dependency tree.
    pub fn node_modules_dir(&self) -> PathBuf {
        self.root.join("node_modules")
    }

    /// The bundler's output directory.
    pub fn dist_dir(&self) -> PathBuf {
        self.root.join("dist")
    }

    /// The cleanup policy this workspace was acquired with.
    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    /// Releases the workspace according to its cleanup policy.
    ///
    /// Auto-delete removes the tree recursively, tolerating a path that has
    /// already vanished. Preserve detaches the directory from deletion and
    /// reports it for operator inspection.
    pub fn release(mut self) -> Result<(), WorkspaceError> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        match self.policy {
            CleanupPolicy::AutoDelete => match dir.close() {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(WorkspaceError::RemoveFailed(e)),
            },
            CleanupPolicy::Preserve => {
                let kept = dir.keep();
                info!(path = %kept.display(), "workspace preserved");
                Ok(())
            }
        }
    }
}
