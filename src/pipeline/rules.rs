//! Rule-based analysis: keyword spotting over extracted report text.
//!
//! This is the safety net used when no LLM is configured. It does not read
//! values or compare them with reference ranges; it only notices which
//! markers a report mentions and attaches a fixed advisory for each. The
//! keyword table is static and has not been clinically reviewed, so do not
//! extend it with numeric thresholds without domain sign-off.

use crate::output::AnalysisResult;
use tracing::debug;

/// Summary attached to every rule-based result.
pub const RULE_BASED_SUMMARY: &str = "Rule-based analysis (fallback)";

/// Sole finding when no marker keyword matches.
pub const REVIEW_MANUALLY: &str = "No standard markers auto-detected; review manually.";

/// Upper bound on the number of findings returned.
pub const MAX_FINDINGS: usize = 6;

/// A blood-test marker recognised by keyword.
#[derive(Debug, Clone, Copy)]
pub struct Marker {
    pub name: &'static str,
    /// Lower-case substrings; any one of them marks the marker as present.
    pub keywords: &'static [&'static str],
    pub advisory: &'static str,
}

impl Marker {
    fn matches(&self, lower: &str) -> bool {
        self.keywords.iter().any(|k| lower.contains(k))
    }
}

/// Known markers in priority order. Findings follow this order.
pub const MARKERS: &[Marker] = &[
    Marker {
        name: "hemoglobin",
        keywords: &["hemoglobin"],
        advisory: "Hemoglobin value detected. Compare with normal ranges (F: 12–15 g/dL, M: 13–17 g/dL).",
    },
    Marker {
        name: "wbc",
        keywords: &["wbc", "white blood cell"],
        advisory: "WBC mentioned; check for signs of infection or inflammation.",
    },
    Marker {
        name: "platelets",
        keywords: &["platelet"],
        advisory: "Platelet count referenced; assess for bleeding risk if low.",
    },
];

/// Analyse report text against [`MARKERS`]. Never fails.
pub fn analyze_text(text: &str) -> AnalysisResult {
    let lower = text.to_lowercase();

    let mut findings: Vec<String> = MARKERS
        .iter()
        .filter(|m| m.matches(&lower))
        .inspect(|m| debug!("Marker detected: {}", m.name))
        .map(|m| m.advisory.to_string())
        .collect();

    if findings.is_empty() {
        findings.push(REVIEW_MANUALLY.to_string());
    }
    findings.truncate(MAX_FINDINGS);

    AnalysisResult::with_findings(RULE_BASED_SUMMARY, findings)
}
