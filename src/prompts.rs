//! Prompts for the blood-report agent.
//!
//! The agent is a single clinician persona with one task. The persona lives
//! in the system message; the task, the caller's query and the report text
//! go into the user message built by [`analysis_task`].
//!
//! Callers can override the persona via
//! [`crate::config::AnalyzerConfig::system_prompt`]; the task prompt is fixed
//! because [`crate::pipeline::reply`] depends on its output contract.

/// Default persona: role, goal and backstory of the reviewing clinician.
pub const DOCTOR_SYSTEM_PROMPT: &str = r#"ROLE
You are a board-certified internal medicine physician.

GOAL
Analyze the uploaded blood test report accurately and safely, explain key
markers, flag abnormalities with ranges, and suggest next steps.
Never fabricate values; if unsure, say so.

BACKSTORY
You are a careful, evidence-based clinician focused on patient safety.
You avoid hallucinations and always cite the exact values from the report text."#;

/// Task instructions and output contract.
pub const ANALYSIS_TASK: &str = r#"Extract relevant metrics (e.g., Hemoglobin, RBC, WBC, Platelets, Glucose, Cholesterol) from the report text below.
Use them to produce a clear, non-alarming summary.
If a value is outside typical adult ranges, flag it and advise consulting a doctor.
If a metric is not found, say 'not present in document'.
Never invent values or diagnoses.

OUTPUT FORMAT
Respond with a single JSON object and nothing else, with keys:
  "summary": string,
  "metrics": object mapping metric name to the value as written in the report,
  "flags": list of strings,
  "recommendations": list of strings"#;

/// Build the user message for one analysis request.
pub fn analysis_task(query: &str, file_name: &str, report_text: &str) -> String {
    let text = if report_text.trim().is_empty() {
        "(no extractable text)"
    } else {
        report_text
    };
    format!(
        "{ANALYSIS_TASK}\n\nPATIENT QUERY\n{query}\n\nREPORT FILE\n{file_name}\n\nREPORT TEXT\n\"\"\"\n{text}\n\"\"\""
    )
}
