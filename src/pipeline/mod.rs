//! Pipeline stages for blood-report analysis.
//!
//! Each submodule implements one step, so both analysis tiers share the
//! extractor and each step is testable without the others.
//!
//! ## Data Flow
//!
//! ```text
//!                     ┌──▶ agent ──▶ reply      (LLM tier)
//! input ──▶ extract ──┤
//! (path)   (pdfium)   └──▶ rules                (fallback tiers)
//! ```
//!
//! 1. [`input`]   — check the report exists and looks like a PDF
//! 2. [`extract`] — page text via pdfium; runs in `spawn_blocking`
//! 3. [`rules`]   — keyword spotting; never fails
//! 4. [`agent`]   — one chat call to the configured provider
//! 5. [`reply`]   — turn the provider's free text into an `AnalysisResult`

pub mod agent;
pub mod extract;
pub mod input;
pub mod reply;
pub mod rules;
