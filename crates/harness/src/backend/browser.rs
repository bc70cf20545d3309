//! Browser backend
//!
//! Serves the staging area over HTTP, opens a WebDriver session, loads the
//! driver page, types the input, presses the trigger and reads the `output`
//! and `errors` areas back. The server and the session are always released,
//! whatever happens in between; a teardown failure is logged and never
//! replaces the error that caused it.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use gramtest_common::{
    BackendKind, BrowserConfig, Error, ExecutionResult, HarnessConfig, Result, StagingArea,
};

use super::ExecutionBackend;
use crate::server::{StaticServer, StaticServerConfig};
use crate::webdriver::WebDriverSession;

/// The static server port is fixed, so browser runs in one process are
/// serialized.
static BROWSER_RUNS: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Element ids of the driver page
pub mod ids {
    pub const INPUT: &str = "input";
    pub const SUBMIT: &str = "submit";
    pub const OUTPUT: &str = "output";
    pub const ERRORS: &str = "errors";
}

/// Runs driver pages in a remote-controlled browser
#[derive(Debug, Clone)]
pub struct BrowserBackend {
    config: BrowserConfig,
    runtime: PathBuf,
}

impl BrowserBackend {
    pub fn new(config: BrowserConfig, runtime: impl Into<PathBuf>) -> Self {
        Self {
            config,
            runtime: runtime.into(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Ok(Self::new(config.browser.clone(), config.runtime()?))
    }

    /// Fails with `EnvironmentUnavailable` when running on the wrong host OS
    pub fn check_platform(&self) -> Result<()> {
        match self.config.required_os.as_deref() {
            Some(required) if required != std::env::consts::OS => {
                Err(Error::EnvironmentUnavailable(format!(
                    "browser backend requires {} (running on {})",
                    required,
                    std::env::consts::OS
                )))
            }
            _ => Ok(()),
        }
    }

    /// Open a session, drive the page, close the session
    async fn drive(&self, server: &StaticServer, page: &str, input: &str) -> Result<ExecutionResult> {
        let session = WebDriverSession::create(&self.config.webdriver_url, &self.config.browser_name).await?;
        debug!(state = "session_opened", session = session.id());

        let result = exchange(&session, &server.url_for(page), input).await;

        let session_id = session.id().to_string();
        if let Err(e) = session.close().await {
            warn!("Failed to close WebDriver session {}: {}", session_id, e);
        }
        result
    }
}

/// Navigate, inject input, trigger, and read both result areas
async fn exchange(session: &WebDriverSession, url: &str, input: &str) -> Result<ExecutionResult> {
    session.navigate(url).await?;
    let input_area = session.find_element_by_id(ids::INPUT).await?;
    session.send_keys(&input_area, input).await?;
    let submit = session.find_element_by_id(ids::SUBMIT).await?;
    session.click(&submit).await?;
    debug!(state = "navigated_and_triggered", url);

    // Text areas are filled through their `value` property, which is what
    // the page scripts write to.
    let errors_area = session.find_element_by_id(ids::ERRORS).await?;
    let errors = session.element_property(&errors_area, "value").await?.unwrap_or_default();
    let output_area = session.find_element_by_id(ids::OUTPUT).await?;
    let output = session.element_property(&output_area, "value").await?.unwrap_or_default();
    debug!(state = "extracted", output_bytes = output.len(), error_bytes = errors.len());

    Ok(ExecutionResult::from_channels(output, errors))
}

#[async_trait]
impl ExecutionBackend for BrowserBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Browser
    }

    async fn execute(&self, staging: &StagingArea, entry: &Path, input: &str) -> Result<ExecutionResult> {
        self.check_platform()?;

        let page = entry
            .strip_prefix(staging.path())
            .unwrap_or(entry)
            .to_string_lossy()
            .replace('\\', "/");

        let _serial = BROWSER_RUNS.lock().await;

        let server = StaticServer::start(StaticServerConfig::new(
            self.config.port,
            staging.path(),
            &self.runtime,
        ))
        .await?;
        debug!(state = "server_started", port = server.port());

        let result = self.drive(&server, &page, input).await;
        if let Err(e) = &result {
            error!("can't exec recognizer: {}", e);
        }

        if let Err(e) = server.stop().await {
            warn!("Failed to stop static server: {}", e);
        }
        info!(state = "torn_down", "browser run finished");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(required_os: Option<&str>) -> BrowserBackend {
        BrowserBackend::new(
            BrowserConfig {
                required_os: required_os.map(String::from),
                ..Default::default()
            },
            "/opt/runtime",
        )
    }

    #[test]
    fn test_platform_check() {
        assert!(backend(None).check_platform().is_ok());
        assert!(backend(Some(std::env::consts::OS)).check_platform().is_ok());

        let err = backend(Some("plan9")).check_platform().unwrap_err();
        assert!(err.is_skip());
    }

    #[test]
    fn test_from_config_requires_runtime() {
        let err = BrowserBackend::from_config(&HarnessConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MissingProperty { .. }));
    }
}
