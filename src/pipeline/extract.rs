//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. Extraction runs on
//! tokio's blocking pool so request handlers never stall a worker thread.
//!
//! ## Output shape
//!
//! Page texts are joined with `\n` in document order and the whole string is
//! trimmed. A page without a text layer contributes an empty string, so a
//! three-page report `["A", "", "B"]` extracts as `"A\n\nB"`. No partial
//! result is ever returned: the first pdfium error aborts the whole report.

use crate::error::{BloodworkError, BoxError};
use crate::pipeline::input::validate_report;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extract the text of every page of the PDF at `path`.
///
/// Fails with [`BloodworkError::FileNotFound`] before pdfium is bound when
/// the path does not exist.
pub async fn extract_text(path: &Path) -> Result<String, BloodworkError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_text_blocking(&owned))
        .await
        .map_err(|e| BloodworkError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of [`extract_text`].
pub fn extract_text_blocking(path: &Path) -> Result<String, BloodworkError> {
    validate_report(path)?;

    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| BloodworkError::extraction(path, pdfium_cause(e)))?;

    let pages = document.pages();
    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| BloodworkError::extraction(path, pdfium_cause(e)))?
            .all();
        debug!("Page {}: {} chars", idx + 1, text.len());
        texts.push(text);
    }

    let joined = join_pages(&texts);
    info!(
        "Extracted {} chars from {} pages of {}",
        joined.len(),
        texts.len(),
        path.display()
    );
    Ok(joined)
}

/// Join per-page texts with `\n` and trim the result.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` when it names an existing file,
/// otherwise the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, BloodworkError> {
    let explicit = std::env::var(PDFIUM_LIB_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    let bindings = match explicit {
        Some(ref lib) if lib.exists() => {
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(lib)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| BloodworkError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn pdfium_cause(e: PdfiumError) -> BoxError {
    format!("{:?}", e).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_keeps_empty_pages() {
        assert_eq!(join_pages(&["A", "", "B"]), "A\n\nB");
    }

    #[test]
    fn join_trims_outer_whitespace() {
        assert_eq!(
            join_pages(&["  \nHemoglobin 13.5 g/dL", "WBC 6.1\n\n"]),
            "Hemoglobin 13.5 g/dL\nWBC 6.1"
        );
    }

    #[test]
    fn join_of_blank_pages_is_empty() {
        assert_eq!(join_pages(&["", "", ""]), "");
        assert_eq!(join_pages::<&str>(&[]), "");
    }

    #[tokio::test]
    async fn missing_path_fails_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_text(&dir.path().join("missing.pdf")).await.unwrap_err();
        assert!(matches!(err, BloodworkError::FileNotFound { .. }), "got: {err}");
    }
}
