//! Pipeline dispatcher: pick one analysis strategy and run it.
//!
//! ## Precedence
//!
//! ```text
//! agent available?      ──yes──▶ AgentPipeline            (LLM)
//!   │ no
//! fallback task enabled? ──yes──▶ FallbackTask             (rules + query)
//!   │ no
//!   └────────────────────────▶ extract ▶ rules          (bare rules)
//! ```
//!
//! The choice is made once, when the [`Analyzer`] is built, and recorded as a
//! [`PipelineMode`]. A request runs exactly that strategy; if it fails the
//! error goes back to the caller and no lower tier is tried.

use crate::config::{AnalyzerConfig, PipelineMode};
use crate::error::BloodworkError;
use crate::output::AnalysisResult;
use crate::pipeline::agent::AgentPipeline;
use crate::pipeline::{extract, rules};
use crate::task::{AnalysisTask, FallbackTask};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

enum Strategy {
    Agent(Arc<dyn AnalysisTask>),
    Fallback(Arc<dyn AnalysisTask>),
    RuleBased,
}

/// The dispatcher. Cheap to share behind an `Arc`; holds no mutable state.
pub struct Analyzer {
    strategy: Strategy,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer").field("mode", &self.mode()).finish()
    }
}

impl Analyzer {
    /// Probe capabilities described by `config` and fix the pipeline mode.
    ///
    /// Never fails: a provider that cannot be resolved downgrades the mode
    /// and is logged once.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let analyzer = if config.agent_enabled {
            match resolve_provider(config) {
                Ok(provider) => Self::with_agent(Arc::new(AgentPipeline::new(provider, config))),
                Err(e) => {
                    warn!("Agent unavailable, using fallback analysis: {}", e);
                    Self::without_agent(config)
                }
            }
        } else {
            debug!("Agent disabled by configuration");
            Self::without_agent(config)
        };

        info!("Pipeline mode: {}", analyzer.mode().as_str());
        analyzer
    }

    fn without_agent(config: &AnalyzerConfig) -> Self {
        if config.fallback_task_enabled {
            Self::with_fallback(Arc::new(FallbackTask))
        } else {
            Self::rule_based_only()
        }
    }

    /// Dispatcher that always runs `agent`.
    pub fn with_agent(agent: Arc<dyn AnalysisTask>) -> Self {
        Self {
            strategy: Strategy::Agent(agent),
        }
    }

    /// Dispatcher that always runs the given fallback task.
    pub fn with_fallback(task: Arc<dyn AnalysisTask>) -> Self {
        Self {
            strategy: Strategy::Fallback(task),
        }
    }

    /// Dispatcher that always runs extraction followed by the keyword rules.
    pub fn rule_based_only() -> Self {
        Self {
            strategy: Strategy::RuleBased,
        }
    }

    /// The mode fixed at construction.
    pub fn mode(&self) -> PipelineMode {
        match self.strategy {
            Strategy::Agent(_) => PipelineMode::AgentAvailable,
            Strategy::Fallback(_) => PipelineMode::FallbackCallable,
            Strategy::RuleBased => PipelineMode::RuleBasedOnly,
        }
    }

    /// Analyse the report at `path`.
    ///
    /// # Errors
    /// - Agent or fallback task failure → [`BloodworkError::PipelineFailed`]
    ///   wrapping the cause.
    /// - Rule-based mode → [`BloodworkError::FileNotFound`] or
    ///   [`BloodworkError::ExtractionFailed`] as raised by the extractor.
    pub async fn analyze(
        &self,
        query: &str,
        path: impl AsRef<Path>,
    ) -> Result<AnalysisResult, BloodworkError> {
        let path = path.as_ref();
        let mode = self.mode();
        debug!("Analysing {} ({})", path.display(), mode.as_str());

        match &self.strategy {
            Strategy::Agent(task) | Strategy::Fallback(task) => task
                .run(query, path)
                .await
                .map_err(|e| BloodworkError::pipeline(mode, e)),
            Strategy::RuleBased => {
                let text = extract::extract_text(path).await?;
                Ok(rules::analyze_text(&text))
            }
        }
    }

    /// Synchronous wrapper around [`Analyzer::analyze`].
    ///
    /// Creates a temporary tokio runtime internally.
    ///
    /// # Panics
    /// Panics when called from inside a tokio runtime, because the temporary
    /// runtime cannot block an async worker. Use [`Analyzer::analyze`] there.
    pub fn analyze_sync(
        &self,
        query: &str,
        path: impl AsRef<Path>,
    ) -> Result<AnalysisResult, BloodworkError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| BloodworkError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.analyze(query, path))
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Name edgequake-llm gives the provider it falls back to when nothing is set.
const MOCK_PROVIDER: &str = "mock";

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn named_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, BloodworkError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        BloodworkError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: e.to_string(),
        }
    })
}

/// Resolve the LLM provider backing the agent.
///
/// Checked in order:
///
/// 1. `config.provider`, used as-is (tests inject providers here).
/// 2. `config.provider_name` with `config.model` or [`DEFAULT_MODEL`].
/// 3. `EDGEQUAKE_LLM_PROVIDER` together with `EDGEQUAKE_MODEL`.
/// 4. `OPENAI_API_KEY` with `config.model` or [`DEFAULT_MODEL`].
/// 5. Whatever `ProviderFactory::from_env` detects.
///
/// With no credentials at all `from_env` hands back its mock provider. That
/// is reported as [`BloodworkError::ProviderNotConfigured`] so the caller
/// downgrades to the rule-based tiers, unless `EDGEQUAKE_LLM_PROVIDER=mock`
/// asked for it.
pub fn resolve_provider(config: &AnalyzerConfig) -> Result<Arc<dyn LLMProvider>, BloodworkError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    if let Some(ref name) = config.provider_name {
        return named_provider(name, model);
    }

    let requested = env_value("EDGEQUAKE_LLM_PROVIDER");
    if let (Some(name), Some(env_model)) = (&requested, env_value("EDGEQUAKE_MODEL")) {
        return named_provider(name, &env_model);
    }

    if env_value("OPENAI_API_KEY").is_some() {
        return named_provider("openai", model);
    }

    // The embedding half of the pair is never used by the agent.
    let (provider, _) =
        ProviderFactory::from_env().map_err(|e| BloodworkError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: e.to_string(),
        })?;
    accept_detected(provider, requested.is_some())
}

/// Refuse the placeholder provider unless it was asked for by name.
fn accept_detected(
    provider: Arc<dyn LLMProvider>,
    requested: bool,
) -> Result<Arc<dyn LLMProvider>, BloodworkError> {
    if provider.name() == MOCK_PROVIDER && !requested {
        return Err(BloodworkError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: "no LLM credentials found; set OPENAI_API_KEY, ANTHROPIC_API_KEY, \
                   GEMINI_API_KEY or EDGEQUAKE_LLM_PROVIDER"
                .to_string(),
        });
    }
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edgequake_llm::MockProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serialises tests that rewrite the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Every variable edgequake-llm or `resolve_provider` reads to pick a provider.
    const PROVIDER_ENV: &[&str] = &[
        "EDGEQUAKE_LLM_PROVIDER",
        "EDGEQUAKE_MODEL",
        "OLLAMA_HOST",
        "OLLAMA_MODEL",
        "LMSTUDIO_HOST",
        "LMSTUDIO_MODEL",
        "ANTHROPIC_API_KEY",
        "GEMINI_API_KEY",
        "GOOGLE_API_KEY",
        "MISTRAL_API_KEY",
        "AZURE_OPENAI_CONTENTGEN_API_KEY",
        "AZURE_OPENAI_API_KEY",
        "XAI_API_KEY",
        "HF_TOKEN",
        "HUGGINGFACE_TOKEN",
        "OPENROUTER_API_KEY",
        "OPENAI_API_KEY",
    ];

    fn clear_provider_env() {
        for key in PROVIDER_ENV {
            std::env::remove_var(key);
        }
    }

    /// Records calls and returns a canned result or error.
    struct StubTask {
        calls: AtomicUsize,
        fail: bool,
        summary: &'static str,
    }

    impl StubTask {
        fn ok(summary: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
                summary,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
                summary: "",
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalysisTask for StubTask {
        async fn run(&self, query: &str, _path: &Path) -> Result<AnalysisResult, BloodworkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BloodworkError::LlmApiError {
                    message: "upstream 503".into(),
                });
            }
            Ok(AnalysisResult {
                summary: self.summary.to_string(),
                flags: vec!["Hemoglobin low".into()],
                result: Some(format!("answered: {query}")),
                ..Default::default()
            })
        }
    }

    fn missing_report() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        (dir, path)
    }

    #[tokio::test]
    async fn agent_result_wins_over_rules() {
        let agent = StubTask::ok("Agent summary");
        let analyzer = Analyzer::with_agent(agent.clone());
        assert_eq!(analyzer.mode(), PipelineMode::AgentAvailable);

        let (_dir, path) = missing_report();
        let out = analyzer.analyze("Analyze blood report", &path).await.unwrap();

        assert_eq!(agent.calls(), 1);
        assert_eq!(out.summary, "Agent summary");
        assert!(out.findings.is_empty());
        assert_eq!(out.result.as_deref(), Some("answered: Analyze blood report"));
    }

    #[tokio::test]
    async fn fallback_task_receives_query() {
        let task = StubTask::ok("Fallback summary");
        let analyzer = Analyzer::with_fallback(task.clone());
        assert_eq!(analyzer.mode(), PipelineMode::FallbackCallable);

        let (_dir, path) = missing_report();
        let out = analyzer.analyze("Check platelets", &path).await.unwrap();
        assert_eq!(task.calls(), 1);
        assert_eq!(out.result.as_deref(), Some("answered: Check platelets"));
    }

    #[tokio::test]
    async fn agent_failure_is_not_retried_lower() {
        let agent = StubTask::failing();
        let analyzer = Analyzer::with_agent(agent.clone());

        let (_dir, path) = missing_report();
        let err = analyzer.analyze("q", &path).await.unwrap_err();

        assert_eq!(agent.calls(), 1);
        match err {
            BloodworkError::PipelineFailed { strategy, source } => {
                assert_eq!(strategy, PipelineMode::AgentAvailable);
                assert!(source.to_string().contains("upstream 503"));
            }
            other => panic!("expected PipelineFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fallback_task_errors_are_wrapped() {
        let analyzer = Analyzer::with_fallback(Arc::new(FallbackTask));
        let (_dir, path) = missing_report();
        let err = analyzer.analyze("q", &path).await.unwrap_err();
        assert!(
            matches!(
                err,
                BloodworkError::PipelineFailed {
                    strategy: PipelineMode::FallbackCallable,
                    ..
                }
            ),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn rule_based_surfaces_not_found_unwrapped() {
        let analyzer = Analyzer::rule_based_only();
        let (_dir, path) = missing_report();
        let err = analyzer.analyze("q", &path).await.unwrap_err();
        assert!(matches!(err, BloodworkError::FileNotFound { .. }), "got: {err:?}");
    }

    #[test]
    fn disabled_agent_uses_fallback_task() {
        let config = AnalyzerConfig::builder().agent_enabled(false).build().unwrap();
        assert_eq!(
            Analyzer::from_config(&config).mode(),
            PipelineMode::FallbackCallable
        );
    }

    #[test]
    fn no_credentials_downgrades_to_fallback_task() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_provider_env();

        assert!(matches!(
            resolve_provider(&AnalyzerConfig::default()),
            Err(BloodworkError::ProviderNotConfigured { .. })
        ));
        assert_eq!(
            Analyzer::from_config(&AnalyzerConfig::default()).mode(),
            PipelineMode::FallbackCallable
        );

        let bare = AnalyzerConfig::builder()
            .fallback_task_enabled(false)
            .build()
            .unwrap();
        assert_eq!(Analyzer::from_config(&bare).mode(), PipelineMode::RuleBasedOnly);
    }

    #[test]
    fn mock_provider_requested_by_name_is_kept() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_provider_env();
        std::env::set_var("EDGEQUAKE_LLM_PROVIDER", "mock");

        let mode = Analyzer::from_config(&AnalyzerConfig::default()).mode();
        clear_provider_env();
        assert_eq!(mode, PipelineMode::AgentAvailable);
    }

    #[test]
    fn unknown_provider_downgrades_to_fallback_task() {
        let config = AnalyzerConfig::builder()
            .provider_name("no-such-provider")
            .build()
            .unwrap();
        match resolve_provider(&config) {
            Err(BloodworkError::ProviderNotConfigured { provider, .. }) => {
                assert_eq!(provider, "no-such-provider");
            }
            Err(other) => panic!("expected ProviderNotConfigured, got {other:?}"),
            Ok(p) => panic!("unexpectedly resolved {}", p.name()),
        }
        assert_eq!(
            Analyzer::from_config(&config).mode(),
            PipelineMode::FallbackCallable
        );
    }

    #[test]
    fn auto_detected_mock_is_refused() {
        let detected = accept_detected(Arc::new(MockProvider::new()), false);
        assert!(matches!(
            detected,
            Err(BloodworkError::ProviderNotConfigured { .. })
        ));
        assert!(accept_detected(Arc::new(MockProvider::new()), true).is_ok());
    }

    #[test]
    fn injected_provider_enables_agent() {
        let config = AnalyzerConfig::builder()
            .provider(Arc::new(MockProvider::new()))
            .build()
            .unwrap();
        assert_eq!(
            Analyzer::from_config(&config).mode(),
            PipelineMode::AgentAvailable
        );
    }

    #[test]
    fn everything_disabled_is_rule_based_only() {
        let config = AnalyzerConfig::builder()
            .agent_enabled(false)
            .fallback_task_enabled(false)
            .build()
            .unwrap();
        assert_eq!(
            Analyzer::from_config(&config).mode(),
            PipelineMode::RuleBasedOnly
        );
    }

    #[test]
    fn analyze_sync_runs_outside_a_runtime() {
        let analyzer = Analyzer::with_agent(StubTask::ok("sync"));
        let (_dir, path) = missing_report();
        let out = analyzer.analyze_sync("q", &path).unwrap();
        assert_eq!(out.summary, "sync");
    }

    #[test]
    fn dispatch_is_stateless_across_requests() {
        let agent = StubTask::ok("again");
        let analyzer = Analyzer::with_agent(agent.clone());
        let (_dir, path) = missing_report();
        for _ in 0..3 {
            let out = tokio_test::block_on(analyzer.analyze("q", &path)).unwrap();
            assert_eq!(out.summary, "again");
        }
        assert_eq!(agent.calls(), 3);
        assert_eq!(analyzer.mode(), PipelineMode::AgentAvailable);
    }
}
