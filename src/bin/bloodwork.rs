//! CLI binary for edgequake-bloodwork.
//!
//! A thin shim over the library crate: maps flags to `AnalyzerConfig` /
//! `ServerConfig`, then either serves HTTP or analyses one local report.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_bloodwork::server::{BloodworkServer, ServerConfig};
use edgequake_bloodwork::{Analyzer, AnalyzerConfig, DEFAULT_QUERY};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the HTTP API on :8000
  bloodwork serve

  # Upload a report
  curl -F file=@report.pdf -F query="Is my iron low?" http://localhost:8000/analyze

  # Analyse a local report without an LLM
  bloodwork --no-agent analyze report.pdf --pretty

PIPELINE MODES (chosen once at startup):
  agent_available     an LLM provider resolved; the clinician agent answers
  fallback_callable   no provider; keyword rules plus the query echoed back
  rule_based_only     no provider and --no-fallback-task; keyword rules only

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Log filter (overrides --verbose / --quiet)

  Variables may also be placed in a .env file in the working directory.
"#;

/// Analyse PDF blood-test reports with an LLM agent and a rule-based fallback.
#[derive(Parser, Debug)]
#[command(
    name = "bloodwork",
    version,
    about = "Analyse PDF blood-test reports with an LLM agent and a rule-based fallback",
    long_about = "Summarise PDF blood-test reports. When an LLM provider is configured a \
clinician-persona agent extracts metrics, flags and recommendations; otherwise a keyword-based \
analysis reports which standard markers the document mentions. Not a medical device.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    agent: AgentArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "BLOODWORK_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, global = true, env = "BLOODWORK_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct AgentArgs {
    /// LLM model ID (e.g. gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Agent temperature (0.0–2.0).
    #[arg(long, global = true, env = "BLOODWORK_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max tokens the agent may generate.
    #[arg(long, global = true, env = "BLOODWORK_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Path to a text file replacing the clinician persona prompt.
    #[arg(long, global = true, env = "BLOODWORK_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Skip the LLM agent even if a provider is configured.
    #[arg(long, global = true, env = "BLOODWORK_NO_AGENT")]
    no_agent: bool,

    /// Without an agent, run bare keyword rules instead of the fallback task.
    #[arg(long, global = true, env = "BLOODWORK_NO_FALLBACK_TASK")]
    no_fallback_task: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (POST /analyze, GET /health).
    Serve {
        /// Bind address.
        #[arg(long, env = "BLOODWORK_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Bind port.
        #[arg(long, env = "BLOODWORK_PORT", default_value_t = 8000)]
        port: u16,

        /// Directory where uploads are staged during analysis.
        #[arg(long, env = "BLOODWORK_UPLOAD_DIR", default_value = "uploads")]
        upload_dir: PathBuf,

        /// Largest accepted upload in MiB.
        #[arg(long, env = "BLOODWORK_MAX_UPLOAD_MB", default_value_t = 20)]
        max_upload_mb: usize,
    },

    /// Analyse one local PDF and print the result as JSON.
    Analyze {
        /// Path to the PDF report.
        input: PathBuf,

        /// Natural-language question about the report.
        #[arg(long, default_value = DEFAULT_QUERY)]
        query: String,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Probe pipeline mode once ─────────────────────────────────────────
    let config = build_config(&cli.agent).await?;
    let analyzer = Arc::new(Analyzer::from_config(&config));

    match cli.command {
        Command::Serve {
            host,
            port,
            upload_dir,
            max_upload_mb,
        } => {
            let server_config = ServerConfig {
                host,
                port,
                upload_dir,
                max_upload_size: max_upload_mb.max(1) * 1024 * 1024,
            };
            let server = BloodworkServer::new(server_config, analyzer);
            eprintln!("Listening on http://{}", server.address());
            server.start().await.context("Server failed")?;
        }
        Command::Analyze {
            input,
            query,
            pretty,
        } => {
            let result = analyzer
                .analyze(&query, &input)
                .await
                .with_context(|| format!("Analysis of {} failed", input.display()))?;

            let json = if pretty {
                serde_json::to_string_pretty(&result)
            } else {
                serde_json::to_string(&result)
            }
            .context("Failed to serialise result")?;

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

/// Map CLI args to `AnalyzerConfig`.
async fn build_config(args: &AgentArgs) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .agent_enabled(!args.no_agent)
        .fallback_task_enabled(!args.no_fallback_task)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }

    builder.build().context("Invalid configuration")
}
