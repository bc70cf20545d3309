//! Core types shared by the harness and its callers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::diagnostics::DiagnosticQueue;

/// Execution environment a driver is packaged for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Headless script interpreter process
    Process,
    /// Browser driven through remote automation
    Browser,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Process => "process",
            BackendKind::Browser => "browser",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "process" | "node" => Ok(BackendKind::Process),
            "browser" | "safari" => Ok(BackendKind::Browser),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

/// Output captured from one backend invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    /// Present only when the driver wrote something to its error channel
    pub stderr: Option<String>,
}

impl ExecutionResult {
    /// Build a result from raw channel contents. Non-empty stderr is kept and
    /// echoed to the harness log, since drivers may report failures without a
    /// non-zero exit.
    pub fn from_channels(stdout: String, stderr: String) -> Self {
        let stderr = if stderr.is_empty() {
            None
        } else {
            warn!("exec stderr: {}", stderr.trim_end());
            Some(stderr)
        };
        Self { stdout, stderr }
    }

    pub fn has_stderr(&self) -> bool {
        self.stderr.is_some()
    }
}

/// Outcome of a full compile-synthesize-execute cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutcome {
    pub diagnostics: DiagnosticQueue,
    /// `None` when compilation reported errors and nothing was executed
    pub result: Option<ExecutionResult>,
}

impl RunOutcome {
    pub fn compiled(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Captured stdout, if the driver ran
    pub fn output(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.stdout.as_str())
    }

    /// Captured stderr, if the driver ran and wrote any
    pub fn stderr(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.stderr.as_deref())
    }
}
