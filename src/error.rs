//! Error types for the edgequake-bloodwork library.
//!
//! Every failure funnels into [`BloodworkError`]. The variants mirror the
//! stages of the analysis pipeline so callers (the HTTP layer in particular)
//! can tell a missing upload from a corrupt PDF from a provider outage:
//!
//! * **Input** — the report path does not exist.
//! * **Extraction** — pdfium could not be loaded or could not read the file.
//! * **Pipeline** — the selected analysis strategy failed. The dispatcher
//!   never retries a lower tier, so this error is final for the request.
//!
//! The rule-based analyzer has no error variant: finding no markers is a
//! valid outcome, not a failure.

use crate::config::PipelineMode;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause carried by wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors returned by the edgequake-bloodwork library.
#[derive(Debug, Error)]
pub enum BloodworkError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Report file was not found at the given path.
    #[error("PDF not found at: '{path}'")]
    FileNotFound { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The file exists but pdfium (or the file system) refused to read it.
    #[error("Failed reading PDF '{path}': {source}")]
    ExtractionFailed {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium on the library search path."
    )]
    PdfiumBindingFailed(String),

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The strategy chosen for this request failed.
    #[error("{strategy} pipeline failed: {source}")]
    PipelineFailed {
        strategy: PipelineMode,
        #[source]
        source: BoxError,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BloodworkError {
    /// Wrap any error as an extraction failure for `path`.
    pub fn extraction(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::ExtractionFailed {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Wrap an error raised by the strategy selected for this request.
    pub fn pipeline(strategy: PipelineMode, source: impl Into<BoxError>) -> Self {
        Self::PipelineFailed {
            strategy,
            source: source.into(),
        }
    }
}
