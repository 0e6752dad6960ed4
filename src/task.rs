//! The call contract shared by every pluggable analysis strategy.
//!
//! Both the agent and the fallback task take `(query, path)` and return an
//! [`AnalysisResult`], so the dispatcher holds them as the same trait object
//! and tests can inject stubs for either tier.

use crate::error::BloodworkError;
use crate::output::AnalysisResult;
use crate::pipeline::{extract, rules};
use async_trait::async_trait;
use std::path::Path;

/// One analysis strategy.
#[async_trait]
pub trait AnalysisTask: Send + Sync {
    /// Analyse the report at `path` in light of `query`.
    async fn run(&self, query: &str, path: &Path) -> Result<AnalysisResult, BloodworkError>;
}

/// Stand-in for the agent when no provider is configured: extract, run the
/// keyword rules and echo the query back.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackTask;

#[async_trait]
impl AnalysisTask for FallbackTask {
    async fn run(&self, query: &str, path: &Path) -> Result<AnalysisResult, BloodworkError> {
        let text = extract::extract_text(path).await?;
        Ok(rules::analyze_text(&text).with_query(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fallback_propagates_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FallbackTask
            .run("Analyze blood report", &dir.path().join("gone.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, BloodworkError::FileNotFound { .. }));
    }
}
