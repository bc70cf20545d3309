//! Static file server for the browser backend
//!
//! Browsers driven through WebDriver will not load pages over `file://`, so
//! the staging area is served over HTTP. Two roots are served from one
//! listener: the staging area first, then the shared runtime directory for
//! anything the staging area does not have. Directory listings are never
//! produced.

use axum::Router;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use gramtest_common::{Error, Result};

/// Configuration for the static server
#[derive(Debug, Clone)]
pub struct StaticServerConfig {
    /// Address to bind
    pub host: IpAddr,

    /// Port to listen on (0 = ephemeral)
    pub port: u16,

    /// Served first
    pub primary_root: PathBuf,

    /// Served when the primary root has no such file
    pub fallback_root: PathBuf,
}

impl StaticServerConfig {
    pub fn new(port: u16, primary_root: impl Into<PathBuf>, fallback_root: impl Into<PathBuf>) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            primary_root: primary_root.into(),
            fallback_root: fallback_root.into(),
        }
    }
}

/// Router serving `primary` with `fallback` behind it
pub fn router(primary: &Path, fallback: &Path) -> Router {
    let runtime = ServeDir::new(fallback).append_index_html_on_directories(false);
    let staging = ServeDir::new(primary)
        .append_index_html_on_directories(false)
        .fallback(runtime);

    Router::new()
        .fallback_service(staging)
        .layer(TraceLayer::new_for_http())
}

/// Handle to a running static server
pub struct StaticServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl StaticServer {
    /// Bind and start serving
    pub async fn start(config: StaticServerConfig) -> Result<Self> {
        let bind = SocketAddr::new(config.host, config.port);
        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .map_err(|e| Error::Server(format!("failed to bind {}: {}", bind, e)))?;
        let addr = listener.local_addr()?;

        let app = router(&config.primary_root, &config.fallback_root);
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
        });

        info!(
            "Static server on http://{} serving {} and {}",
            addr,
            config.primary_root.display(),
            config.fallback_root.display()
        );

        Ok(Self {
            addr,
            shutdown: Some(tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URL of the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of a file relative to the served roots
    pub fn url_for(&self, file: &str) -> String {
        format!("{}/{}", self.base_url(), file.trim_start_matches('/'))
    }

    /// Stop the server and wait for the listener to be released
    pub async fn stop(mut self) -> Result<()> {
        info!("Stopping static server on {}", self.addr);
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(served) => served.map_err(|e| Error::Server(format!("server failed: {}", e))),
            Err(e) => Err(Error::Server(format!("server task failed: {}", e))),
        }
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            debug!("Static server on {} dropped without stop()", self.addr);
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            warn!("Aborting static server task on {}", self.addr);
            task.abort();
        }
    }
}
