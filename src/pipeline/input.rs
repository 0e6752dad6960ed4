//! Input validation: make sure a report path points at a readable PDF.
//!
//! Runs before pdfium is bound so a missing upload is reported as
//! [`BloodworkError::FileNotFound`] without touching the PDF engine, and a
//! stray non-PDF gets a meaningful error rather than a pdfium parse failure.

use crate::error::BloodworkError;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Validate that `path` exists, is readable and starts with the `%PDF` magic.
pub fn validate_report(path: &Path) -> Result<(), BloodworkError> {
    if !path.exists() {
        return Err(BloodworkError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut f = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(BloodworkError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(BloodworkError::extraction(path, e)),
    };

    let mut magic = [0u8; 4];
    if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(BloodworkError::extraction(
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("not a PDF (first bytes: {magic:?})"),
            ),
        ));
    }

    debug!("Validated report: {}", path.display());
    Ok(())
}
