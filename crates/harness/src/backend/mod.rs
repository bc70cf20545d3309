//! Execution backends
//!
//! A backend runs a synthesized driver from a staging area and returns what
//! it printed. Callers only see [`ExecutionBackend`]; whatever a variant holds
//! while running (a child process, a server and a browser session) is private
//! to it and released before `execute` returns.

use async_trait::async_trait;
use std::path::Path;

use gramtest_common::{BackendKind, ExecutionResult, HarnessConfig, Result, StagingArea};

pub mod browser;
pub mod process;

pub use browser::BrowserBackend;
pub use process::ProcessBackend;

/// An environment capable of running a driver
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Which packaging this backend expects drivers in
    fn kind(&self) -> BackendKind;

    /// Run `entry` from `staging` against `input`.
    ///
    /// Fails only when the environment cannot be reached or driven; whatever
    /// the driver itself reports comes back in the result.
    async fn execute(&self, staging: &StagingArea, entry: &Path, input: &str) -> Result<ExecutionResult>;
}

/// Build the backend of `kind` from configuration
pub fn for_kind(kind: BackendKind, config: &HarnessConfig) -> Result<Box<dyn ExecutionBackend>> {
    Ok(match kind {
        BackendKind::Process => Box::new(ProcessBackend::from_config(config)?),
        BackendKind::Browser => Box::new(BrowserBackend::from_config(config)?),
    })
}
