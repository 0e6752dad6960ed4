//! Agent pipeline: drive the LLM provider with the clinician persona.
//!
//! The agent reads the report through the same extractor the fallback path
//! uses, sends one chat request and hands the reply to
//! [`crate::pipeline::reply::normalize_reply`]. There is no retry here: a
//! provider error ends the request, and the dispatcher does not fall back to
//! a lower tier.
//!
//! ## Message Layout
//!
//! 1. **System message** — persona prompt (or the configured override)
//! 2. **User message** — task contract, patient query, file name, report text

use crate::config::AnalyzerConfig;
use crate::error::BloodworkError;
use crate::output::AnalysisResult;
use crate::pipeline::{extract, reply};
use crate::prompts::{analysis_task, DOCTOR_SYSTEM_PROMPT};
use crate::task::AnalysisTask;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// [`AnalysisTask`] backed by an LLM provider.
pub struct AgentPipeline {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
}

impl AgentPipeline {
    /// Build the agent from a resolved provider and the analyzer config.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DOCTOR_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
        }
    }
}

#[async_trait]
impl AnalysisTask for AgentPipeline {
    async fn run(&self, query: &str, path: &Path) -> Result<AnalysisResult, BloodworkError> {
        let start = Instant::now();
        let report_text = extract::extract_text(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let task = analysis_task(query, &file_name, &report_text);
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(task.as_str()),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| BloodworkError::LlmApiError {
                message: e.to_string(),
            })?;

        debug!(
            "Agent: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        info!("Agent analysis finished in {:?}", start.elapsed());

        Ok(reply::normalize_reply(&response.content))
    }
}

/// Build `CompletionOptions` from the analyzer config.
fn build_options(config: &AnalyzerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = AnalyzerConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn build_options_follow_builder() {
        let config = AnalyzerConfig::builder()
            .temperature(0.0)
            .max_tokens(512)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(512));
    }
}
