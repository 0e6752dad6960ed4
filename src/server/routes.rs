//! Request handlers.

use crate::config::DEFAULT_QUERY;
use crate::output::AnalysisResult;
use crate::server::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{json, Value};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// `POST /analyze` — multipart fields `query` (optional) and `file` (required).
///
/// The upload is staged as a temp file in the upload directory and removed
/// when the handler returns, whether the analysis succeeded or not.
pub async fn analyze_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let mut query: Option<String> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "query" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read query: {}", e)))?;
                query = Some(text);
            }
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                upload = Some((filename, data.to_vec()));
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing 'file' field.".into()))?;
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::BadRequest("Only PDF files are supported.".into()));
    }

    let query = query
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());

    info!("Analysing upload '{}' ({} bytes)", filename, data.len());
    let report = stage_upload(state.upload_dir(), data).await?;

    // `report` is dropped (and the file deleted) on every path out of here.
    let result = state.analyzer().analyze(&query, report.path()).await?;
    Ok(Json(result))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "mode": state.analyzer().mode(),
    }))
}

/// Write upload bytes to a uniquely named `.pdf` temp file in `dir`.
///
/// File writes run on the blocking pool, like PDF extraction does.
async fn stage_upload(dir: &Path, data: Vec<u8>) -> Result<NamedTempFile, ApiError> {
    tokio::fs::create_dir_all(dir).await.map_err(ApiError::Upload)?;

    let dir = dir.to_path_buf();
    let tmp = tokio::task::spawn_blocking(move || -> io::Result<NamedTempFile> {
        let mut tmp = tempfile::Builder::new()
            .prefix("report-")
            .suffix(".pdf")
            .tempfile_in(&dir)?;
        tmp.write_all(&data)?;
        tmp.flush()?;
        Ok(tmp)
    })
    .await
    .map_err(|e| ApiError::Upload(io::Error::other(e)))?
    .map_err(ApiError::Upload)?;

    debug!("Staged upload at {}", tmp.path().display());
    Ok(tmp)
}
