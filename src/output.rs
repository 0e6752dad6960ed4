//! Result type returned by every analysis strategy.
//!
//! All three strategies produce the same [`AnalysisResult`] so the HTTP layer
//! serialises one shape. Fields a strategy does not fill stay empty and are
//! omitted from the JSON, which keeps the rule-based payload to exactly
//! `{"summary", "findings"}` and the agent payload free of an empty
//! `findings` list.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured analysis of one blood-test report.
///
/// Only JSON primitives live here; opaque provider objects are converted
/// before they reach this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Free-text summary. Always present.
    pub summary: String,

    /// Advisory sentences from the rule-based analyzer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<String>,

    /// Marker name → value as reported by the agent.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metrics: Map<String, Value>,

    /// Out-of-range or noteworthy markers flagged by the agent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,

    /// Next steps suggested by the agent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,

    /// Raw agent reply, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Query echoed by the fallback task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl AnalysisResult {
    /// Result carrying only a summary and findings.
    pub fn with_findings(summary: impl Into<String>, findings: Vec<String>) -> Self {
        Self {
            summary: summary.into(),
            findings,
            ..Default::default()
        }
    }

    /// Attach the caller's query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}
