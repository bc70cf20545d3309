//! Headless interpreter backend
//!
//! Runs `interpreter <driver> <input>` with the staging area as working
//! directory and with both the shared runtime and the staging area on the
//! module search path, so `require('antlr4')` and `require('./TLexer')`
//! resolve.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error};

use gramtest_common::staging::INPUT_FILE;
use gramtest_common::{BackendKind, Error, ExecutionResult, HarnessConfig, Result, StagingArea};

use super::ExecutionBackend;
use crate::capture::CapturedChild;

/// Module search path variable understood by the interpreter
pub const MODULE_PATH_VAR: &str = "NODE_PATH";

/// Spawns the driver under a script interpreter
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    interpreter: PathBuf,
    runtime: PathBuf,
}

impl ProcessBackend {
    pub fn new(interpreter: impl Into<PathBuf>, runtime: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            runtime: runtime.into(),
        }
    }

    /// Requires both the interpreter and the runtime location
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Ok(Self::new(config.interpreter()?, config.runtime()?))
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Module search path: shared runtime first, then the staging area
    pub fn module_path(&self, staging: &StagingArea) -> Result<OsString> {
        std::env::join_paths([self.runtime.as_path(), staging.path()])
            .map_err(|e| Error::InvalidConfig(format!("cannot build {}: {}", MODULE_PATH_VAR, e)))
    }

    /// The fully configured command for one run
    pub fn command(&self, staging: &StagingArea, entry: &Path) -> Result<Command> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(entry)
            .arg(staging.input_path())
            .env(MODULE_PATH_VAR, self.module_path(staging)?)
            .current_dir(staging.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

#[async_trait]
impl ExecutionBackend for ProcessBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Process
    }

    async fn execute(&self, staging: &StagingArea, entry: &Path, input: &str) -> Result<ExecutionResult> {
        staging.write_file(INPUT_FILE, input)?;

        debug!(state = "spawning", "{} {}", self.interpreter.display(), entry.display());
        let child = self.command(staging, entry)?.spawn().map_err(|source| {
            error!("can't exec recognizer: {}", source);
            Error::Spawn {
                program: self.interpreter.display().to_string(),
                source,
            }
        })?;

        let running = CapturedChild::attach(child)?;
        debug!(state = "running", pid = ?running.id());

        let (status, result) = running.wait().await?;
        debug!(
            state = "terminated",
            %status,
            stdout_bytes = result.stdout.len(),
            "driver finished"
        );
        Ok(result)
    }
}
