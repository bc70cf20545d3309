//! Per-run staging directories

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::Result;

/// File name of the literal input payload inside a staging area
pub const INPUT_FILE: &str = "input";

/// A disposable directory owned by exactly one run.
///
/// Each area gets a unique name under the staging root, so concurrent runs
/// never collide. The directory is removed on drop unless the configuration
/// asks to keep it.
pub struct StagingArea {
    dir: Option<TempDir>,
    path: PathBuf,
    keep: bool,
}

impl StagingArea {
    /// Create a fresh staging area under the configured root
    pub fn create(config: &HarnessConfig) -> Result<Self> {
        Self::create_in(&config.staging_root, config.keep_staging)
    }

    /// Create a fresh staging area under `root`
    pub fn create_in(root: &Path, keep: bool) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("gramtest-").tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        debug!("Created staging area {}", path.display());

        Ok(Self {
            dir: Some(dir),
            path,
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the literal input payload
    pub fn input_path(&self) -> PathBuf {
        self.path.join(INPUT_FILE)
    }

    /// Ensure a subdirectory exists and return its path
    pub fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.path.join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write `content` to `relative`, creating parent directories as needed
    pub fn write_file(&self, relative: impl AsRef<Path>, content: &str) -> Result<PathBuf> {
        let target = self.path.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)?;
        debug!("Wrote {} ({} bytes)", target.display(), content.len());
        Ok(target)
    }

    /// Stop managing the directory and leave it on disk
    pub fn persist(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.keep {
            let path = dir.into_path();
            info!("Keeping staging area {}", path.display());
        } else if let Err(e) = dir.close() {
            warn!("Failed to remove staging area {}: {}", self.path.display(), e);
        }
    }
}

impl std::fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingArea")
            .field("path", &self.path)
            .field("keep", &self.keep)
            .finish()
    }
}
