//! HTTP service for blood-report analysis.
//!
//! | Route           | Description |
//! |-----------------|-------------|
//! | `POST /analyze` | multipart upload (`file`, optional `query`) → `AnalysisResult` |
//! | `GET /health`   | liveness plus the pipeline mode fixed at startup |
//!
//! The [`Analyzer`] is built once before the server starts and shared by all
//! requests; handlers hold no other state.

pub mod error;
pub mod routes;

use crate::analyze::Analyzer;
use crate::error::BloodworkError;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Listener and upload settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address. Default: 0.0.0.0.
    pub host: String,
    /// Bind port. Default: 8000.
    pub port: u16,
    /// Where uploads are staged while they are analysed. Default: `uploads`.
    pub upload_dir: PathBuf,
    /// Largest accepted request body in bytes. Default: 20 MiB.
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_size: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    analyzer: Arc<Analyzer>,
    upload_dir: PathBuf,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                analyzer,
                upload_dir: upload_dir.into(),
            }),
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.inner.analyzer
    }

    pub fn upload_dir(&self) -> &Path {
        &self.inner.upload_dir
    }
}

/// Build the application router.
pub fn router(state: AppState, max_upload_size: usize) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/analyze",
            post(routes::analyze_report).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// The HTTP server.
pub struct BloodworkServer {
    config: ServerConfig,
    state: AppState,
}

impl BloodworkServer {
    pub fn new(config: ServerConfig, analyzer: Arc<Analyzer>) -> Self {
        let state = AppState::new(analyzer, config.upload_dir.clone());
        Self { config, state }
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> Result<(), BloodworkError> {
        let addr: SocketAddr = self
            .config
            .address()
            .parse()
            .map_err(|e| BloodworkError::InvalidConfig(format!("Invalid address: {}", e)))?;

        let router = router(self.state.clone(), self.config.max_upload_size);

        info!(
            "Serving on http://{} (mode: {})",
            addr,
            self.state.analyzer().mode().as_str()
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| BloodworkError::InvalidConfig(format!("Failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| BloodworkError::Internal(format!("Server error: {}", e)))
    }

    pub fn address(&self) -> String {
        self.config.address()
    }
}
