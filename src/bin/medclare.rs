//! CLI binary for medclare.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use medclare::config::parse_model_list;
use medclare::{
    AnalysisConfig, AnalysisProgressCallback, Analyzer, DocumentKind, FallbackPolicy, Phase,
    ProgressCallback, TranslateResponse, UploadResponse,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one spinner whose message follows the current phase,
/// plus a log line per model failure and per finished phase.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading report…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn phase_title(phase: Phase) -> &'static str {
    match phase {
        Phase::Generate => "Analysing",
        Phase::Verify => "Verifying",
        Phase::Translate => "Translating",
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_phase_start(&self, phase: Phase) {
        self.bar.set_prefix(phase_title(phase));
    }

    fn on_model_attempt(&self, _phase: Phase, model: &str) {
        self.bar.set_message(model.to_string());
    }

    fn on_model_failed(&self, phase: Phase, model: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<10} {}  {}",
            red("✗"),
            phase.to_string(),
            model,
            red(&msg)
        ));
    }

    fn on_phase_complete(&self, phase: Phase, model: &str, output_len: usize) {
        self.bar.println(format!(
            "  {} {:<10} {}  {}",
            green("✓"),
            phase.to_string(),
            model,
            dim(&format!("{output_len:>5} chars")),
        ));
    }

    fn on_phase_skipped(&self, phase: Phase, reason: &str) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            dim("–"),
            phase.to_string(),
            dim(reason)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Explain a lab report in English (Markdown on stdout)
  medclare analyze blood_test.pdf

  # Explain a photographed report in Spanish, JSON like the /upload endpoint
  medclare analyze scan.jpg --language Spanish --json

  # Translate an existing English analysis
  medclare translate --text-file analysis.md --raw-file raw.txt --language Hindi

  # Try specific models, in order
  medclare --model google/gemini-2.5-flash --model google/gemini-2.0-flash-001 analyze report.pdf

ENVIRONMENT VARIABLES:
  MEDCLARE_API_KEY     API key for the chat-completions endpoint
  OPENROUTER_API_KEY   Used when MEDCLARE_API_KEY is unset
  MEDCLARE_BASE_URL    OpenAI-compatible base URL (default: https://openrouter.ai/api/v1)
  MEDCLARE_MODELS      Comma-separated model candidates, tried in order
  PDFIUM_LIB_PATH      Path to the pdfium shared library (default: ./, then system)
  RUST_LOG             Override log filtering (e.g. medclare=debug)
"#;

/// Explain medical reports in plain language using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "medclare",
    version,
    about = "Explain medical reports (PDF or image) in plain language, in any language",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Model candidate, repeatable; replaces the default list (tried in order).
    #[arg(long = "model", global = true)]
    models: Vec<String>,

    /// OpenAI-compatible base URL.
    #[arg(long, global = true, env = "MEDCLARE_BASE_URL")]
    base_url: Option<String>,

    /// Only use the first model for verify and translate (no fallback).
    #[arg(long, global = true)]
    primary_only_followups: bool,

    /// Per-call LLM timeout in seconds.
    #[arg(long, global = true, env = "MEDCLARE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "MEDCLARE_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, global = true, env = "MEDCLARE_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Output JSON shaped like the HTTP API responses.
    #[arg(long, global = true)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "MEDCLARE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MEDCLARE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MEDCLARE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a PDF, PNG or JPEG report.
    Analyze {
        /// Report file (.pdf, .png, .jpg, .jpeg).
        file: PathBuf,

        /// Output language.
        #[arg(short, long, default_value = "English")]
        language: String,
    },
    /// Translate an English analysis, keeping its structure.
    Translate {
        /// Markdown file with the English analysis.
        #[arg(long)]
        text_file: PathBuf,

        /// File with the raw report findings (context for the translator).
        #[arg(long)]
        raw_file: Option<PathBuf>,

        /// Target language.
        #[arg(short, long)]
        language: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner lines carry the same information.
    let show_progress = !g.quiet && !g.no_progress && !g.json;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
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

    let config = build_config(g)?;
    let progress = show_progress.then(CliProgressCallback::new);

    let mut analyzer = Analyzer::from_config(config).context("Failed to set up the analyzer")?;
    if let Some(ref cb) = progress {
        analyzer = analyzer.with_progress(Arc::clone(cb) as ProgressCallback);
    }

    let outcome = run(&cli.command, &analyzer, g.json).await;
    if let Some(cb) = progress {
        cb.finish();
    }
    let rendered = outcome?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(rendered.as_bytes())
        .context("Failed to write to stdout")?;
    // Ensure a trailing newline on stdout.
    if !rendered.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }

    if !g.quiet && !g.json {
        eprintln!("{} done", green("✔"));
    }
    Ok(())
}

/// Execute the subcommand and render its output.
async fn run(command: &Command, analyzer: &Analyzer, json: bool) -> Result<String> {
    match command {
        Command::Analyze { file, language } => {
            let kind = DocumentKind::from_path(file)?;
            let result = analyzer
                .analyze_file(file, language)
                .await
                .context("Analysis failed")?;

            if json {
                let filename = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let body = UploadResponse::new(filename, kind, result);
                serde_json::to_string_pretty(&body).context("Failed to serialise output")
            } else {
                if !result.translated && !medclare::pipeline::input::is_english(language) {
                    eprintln!(
                        "{} translation to {} failed; showing English",
                        cyan("⚠"),
                        language
                    );
                }
                Ok(result.analysis)
            }
        }
        Command::Translate {
            text_file,
            raw_file,
            language,
        } => {
            let text = tokio::fs::read_to_string(text_file)
                .await
                .with_context(|| format!("Failed to read {:?}", text_file))?;
            let raw = match raw_file {
                Some(path) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read {:?}", path))?,
                None => String::new(),
            };

            let analysis = analyzer
                .translate(&text, &raw, language)
                .await
                .context("Translation failed")?;

            if json {
                serde_json::to_string_pretty(&TranslateResponse { analysis })
                    .context("Failed to serialise output")
            } else {
                Ok(analysis)
            }
        }
    }
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(g: &GlobalArgs) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::from_env()
        .api_timeout_secs(g.api_timeout)
        .temperature(g.temperature)
        .max_tokens(g.max_tokens);

    if !g.models.is_empty() {
        let models: Vec<String> = g.models.iter().flat_map(|m| parse_model_list(m)).collect();
        builder = builder.models(models);
    }
    if let Some(ref url) = g.base_url {
        builder = builder.base_url(url.clone());
    }
    if g.primary_only_followups {
        builder = builder
            .phase_policy(Phase::Verify, FallbackPolicy::PrimaryOnly)
            .phase_policy(Phase::Translate, FallbackPolicy::PrimaryOnly);
    }

    builder.build().context("Invalid configuration")
}
