//! gramtest Common Library
//!
//! Shared types for the gramtest harness: configuration, the error taxonomy,
//! grammar tool diagnostics, per-run staging areas and execution results.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod staging;
pub mod types;

// Re-export commonly used types
pub use config::{BrowserConfig, HarnessConfig};
pub use diagnostics::{Diagnostic, DiagnosticQueue, Severity};
pub use error::{Error, Result};
pub use staging::StagingArea;
pub use types::*;

/// gramtest version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
