//! Configuration types for blood-report analysis.
//!
//! Everything the dispatcher needs at startup lives in [`AnalyzerConfig`],
//! built via its [`AnalyzerConfigBuilder`]. The config is resolved exactly
//! once into an [`crate::Analyzer`], which fixes the [`PipelineMode`] for the
//! lifetime of the process.

use crate::error::BloodworkError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Query used when the caller does not supply one.
pub const DEFAULT_QUERY: &str = "Analyze blood report";

/// Which analysis strategy the dispatcher runs, in precedence order.
///
/// Probed once when the [`crate::Analyzer`] is built and never re-evaluated
/// per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// An LLM provider resolved; requests go to the agent pipeline.
    AgentAvailable,
    /// No agent, but the fallback task (extract + rules + query echo) is enabled.
    FallbackCallable,
    /// Bare extraction followed by the rule-based analyzer.
    RuleBasedOnly,
}

impl PipelineMode {
    /// Stable identifier used in logs and the `/health` payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::AgentAvailable => "agent_available",
            PipelineMode::FallbackCallable => "fallback_callable",
            PipelineMode::RuleBasedOnly => "rule_based_only",
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineMode::AgentAvailable => "agent",
            PipelineMode::FallbackCallable => "fallback task",
            PipelineMode::RuleBasedOnly => "rule-based",
        };
        f.write_str(label)
    }
}

/// Configuration for the analysis pipeline.
///
/// # Example
/// ```rust
/// use edgequake_bloodwork::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .model("gpt-4.1-mini")
///     .temperature(0.0)
///     .build()
///     .unwrap();
/// assert!(config.agent_enabled);
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Try to resolve an LLM provider at startup. Default: true.
    ///
    /// When false the agent tier is skipped without probing, which keeps
    /// start-up free of network and credential lookups.
    pub agent_enabled: bool,

    /// Use the fallback task when no agent is available. Default: true.
    ///
    /// Disabling it leaves the bare rule-based path, which omits the `query`
    /// echo from results.
    pub fallback_task_enabled: bool,

    /// LLM model identifier, e.g. "gpt-4.1-mini". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the agent. Default: 0.1.
    ///
    /// The agent must quote values from the report, not invent them; a low
    /// temperature keeps it close to the text.
    pub temperature: f32,

    /// Maximum tokens the agent may generate. Default: 2048.
    pub max_tokens: usize,

    /// Custom persona prompt. If None, uses [`crate::prompts::DOCTOR_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            agent_enabled: true,
            fallback_task_enabled: true,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 2048,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("agent_enabled", &self.agent_enabled)
            .field("fallback_task_enabled", &self.fallback_task_enabled)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn agent_enabled(mut self, v: bool) -> Self {
        self.config.agent_enabled = v;
        self
    }

    pub fn fallback_task_enabled(mut self, v: bool) -> Self {
        self.config.fallback_task_enabled = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, BloodworkError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(BloodworkError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if let Some(ref prompt) = c.system_prompt {
            if prompt.trim().is_empty() {
                return Err(BloodworkError::InvalidConfig(
                    "system prompt override is empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}
