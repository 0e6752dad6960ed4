//! # edgequake-bloodwork
//!
//! Summarise PDF blood-test reports with an LLM agent, falling back to a
//! deterministic keyword analysis when no provider is configured.
//!
//! Not a medical device: output is not clinically validated.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF + query
//!  │
//!  ├─ 1. Probe    resolve an LLM provider once at startup → PipelineMode
//!  ├─ 2. Extract  page text via pdfium (spawn_blocking), joined with \n
//!  ├─ 3. Analyse  one strategy, chosen by mode:
//!  │                agent      → clinician persona chat → normalised JSON
//!  │                fallback   → keyword rules + query echo
//!  │                rule-based → keyword rules
//!  └─ 4. Output   AnalysisResult (summary, findings | metrics/flags/…)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_bloodwork::{Analyzer, AnalyzerConfig, DEFAULT_QUERY};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY;
//!     // without one the rule-based fallback is used.
//!     let analyzer = Analyzer::from_config(&AnalyzerConfig::default());
//!     let result = analyzer.analyze(DEFAULT_QUERY, "report.pdf").await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `bloodwork` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//! | `server` | on      | HTTP service (`POST /analyze`, `GET /health`) on axum |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod task;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{resolve_provider, Analyzer};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, PipelineMode, DEFAULT_QUERY};
pub use error::BloodworkError;
pub use output::AnalysisResult;
pub use pipeline::extract::extract_text;
pub use pipeline::rules::analyze_text;
pub use task::{AnalysisTask, FallbackTask};
