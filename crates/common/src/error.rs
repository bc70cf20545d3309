//! Error types for gramtest

use thiserror::Error;

/// Result type alias using the gramtest Error
pub type Result<T> = std::result::Result<T, Error>;

/// gramtest error types
///
/// Compiler diagnostics and runtime stderr are data, not errors: they live in
/// [`crate::DiagnosticQueue`] and [`crate::ExecutionResult`]. Everything here
/// either aborts a run or skips it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Driver synthesis error: {0}")]
    Synthesis(String),

    #[error("Missing system property: {name}")]
    MissingProperty { name: &'static str },

    #[error("Environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("WebDriver error during {command}: {message}")]
    WebDriver { command: String, message: String },

    #[error("Static server error: {0}")]
    Server(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means the run should be reported as skipped
    /// rather than failed.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Error::EnvironmentUnavailable(_) | Error::MissingProperty { .. }
        )
    }

    /// Shorthand for a WebDriver command failure.
    pub fn webdriver(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::WebDriver {
            command: command.into(),
            message: message.into(),
        }
    }
}
