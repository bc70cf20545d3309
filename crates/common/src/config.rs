//! Harness configuration
//!
//! Everything the harness needs to know about the host is carried in one
//! explicit [`HarnessConfig`] that callers build (or load) and pass in. Values
//! may come from a TOML file, from environment overrides, or both.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming the script interpreter binary.
pub const ENV_INTERPRETER: &str = "GRAMTEST_NODEJS";
/// Environment variable naming the shared runtime support directory.
pub const ENV_RUNTIME: &str = "GRAMTEST_RUNTIME";
/// Environment variable holding the grammar tool command line.
pub const ENV_TOOL: &str = "GRAMTEST_TOOL";
/// Environment variable naming the WebDriver endpoint.
pub const ENV_WEBDRIVER: &str = "GRAMTEST_WEBDRIVER";
/// Environment variable overriding the staging root.
pub const ENV_STAGING_ROOT: &str = "GRAMTEST_STAGING_ROOT";

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory under which per-run staging directories are created
    pub staging_root: PathBuf,

    /// Script interpreter used by the process backend (typically node)
    pub interpreter_path: Option<PathBuf>,

    /// Shared runtime support directory (the target runtime library)
    pub runtime_path: Option<PathBuf>,

    /// Grammar tool command line, options are appended to it
    pub tool_command: Vec<String>,

    /// Keep staging directories after the run
    pub keep_staging: bool,

    /// Browser backend configuration
    pub browser: BrowserConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            staging_root: std::env::temp_dir(),
            interpreter_path: None,
            runtime_path: None,
            tool_command: Vec::new(),
            keep_staging: false,
            browser: BrowserConfig::default(),
        }
    }
}

/// Browser backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Fixed port of the local static file server
    pub port: u16,

    /// Remote WebDriver endpoint
    pub webdriver_url: String,

    /// Browser requested when opening a session
    pub browser_name: String,

    /// Host operating system the backend is restricted to (`std::env::consts::OS` value)
    pub required_os: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            webdriver_url: "http://127.0.0.1:4444".to_string(),
            browser_name: "safari".to_string(),
            required_os: Some("macos".to_string()),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of the current values
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup(ENV_INTERPRETER) {
            self.interpreter_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_RUNTIME) {
            self.runtime_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_TOOL) {
            self.tool_command = v.split_whitespace().map(String::from).collect();
        }
        if let Some(v) = lookup(ENV_WEBDRIVER) {
            self.browser.webdriver_url = v;
        }
        if let Some(v) = lookup(ENV_STAGING_ROOT) {
            self.staging_root = PathBuf::from(v);
        }
    }

    /// Interpreter binary, or the fixed missing-property failure
    pub fn interpreter(&self) -> Result<&Path> {
        self.interpreter_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(Error::MissingProperty { name: ENV_INTERPRETER })
    }

    /// Runtime support directory, or the fixed missing-property failure
    pub fn runtime(&self) -> Result<&Path> {
        self.runtime_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(Error::MissingProperty { name: ENV_RUNTIME })
    }

    /// Grammar tool command line split into program and leading arguments
    pub fn tool(&self) -> Result<(&str, &[String])> {
        match self.tool_command.split_first() {
            Some((program, args)) => Ok((program.as_str(), args)),
            None => Err(Error::MissingProperty { name: ENV_TOOL }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_interpreter_is_fixed_message() {
        let config = HarnessConfig::default();
        let err = config.interpreter().unwrap_err();
        assert!(err.is_skip());
        assert_eq!(err.to_string(), "Missing system property: GRAMTEST_NODEJS");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_INTERPRETER, "/usr/local/bin/node"),
            (ENV_RUNTIME, "/opt/antlr4/runtime/JavaScript/src"),
            (ENV_TOOL, "java -jar antlr-complete.jar"),
            (ENV_WEBDRIVER, ""),
        ]
        .into_iter()
        .collect();

        let mut config = HarnessConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.interpreter().unwrap(), Path::new("/usr/local/bin/node"));
        let (program, args) = config.tool().unwrap();
        assert_eq!(program, "java");
        assert_eq!(args, ["-jar".to_string(), "antlr-complete.jar".to_string()]);
        // Blank values do not override
        assert_eq!(config.browser.webdriver_url, "http://127.0.0.1:4444");
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gramtest.toml");
        std::fs::write(
            &path,
            r#"
interpreter_path = "/usr/bin/node"
keep_staging = true

[browser]
port = 9090
"#,
        )
        .unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert!(config.keep_staging);
        assert_eq!(config.browser.port, 9090);
        assert_eq!(config.browser.browser_name, "safari");
        assert!(config.runtime().is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let config = HarnessConfig::load(Path::new("/nonexistent/gramtest.toml")).unwrap();
        assert_eq!(config.browser.port, 8080);
        assert!(config.tool_command.is_empty());
    }
}
