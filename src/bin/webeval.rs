//! CLI binary for edgequake-webeval.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `EvaluatorConfig`, shows a spinner while the pipeline runs, and prints
//! the recovered assessment.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_webeval::{
    evaluate_url, EvaluationProgressCallback, EvaluationReport, Evaluator, EvaluatorConfig,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
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
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner: one per evaluation, replaced at each fetch start and
/// cleared when the evaluation finishes or fails.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref bar) = *guard {
                f(bar);
            }
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl EvaluationProgressCallback for CliProgressCallback {
    fn on_fetch_start(&self, _url: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message("Fetching content from the website…");
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn on_fetch_complete(&self, _url: &str, text_len: usize) {
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} Page fetched  {}",
                green("✓"),
                dim(&format!("{text_len} chars of text"))
            ))
        });
    }

    fn on_fetch_error(&self, _url: &str, _error: &str) {
        self.clear();
    }

    fn on_evaluation_start(&self, model_id: &str) {
        self.with_bar(|bar| bar.set_message(format!("Evaluating text quality using {model_id}…")));
    }

    fn on_evaluation_complete(&self, _elapsed_ms: u64) {
        self.clear();
    }

    fn on_evaluation_error(&self, _error: &str) {
        self.clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Evaluate one page
  webeval https://example.org

  # Prompt for URLs until EOF or "quit"
  webeval --interactive

  # Full report as JSON, including timings and the raw model answer
  webeval --json https://example.org > report.json

  # Use an OpenAI-compatible chat provider instead of Bedrock
  webeval --provider openai --model gpt-4.1-mini https://example.org

  # Custom schema
  webeval --schema ./schemas/blog.json https://example.org/blog

ENVIRONMENT VARIABLES:
  AWS_BEARER_TOKEN_BEDROCK  Bedrock API key (invoke-model endpoint)
  AWS_REGION                Bedrock region (default: us-west-2)
  WEBEVAL_ENDPOINT          Override the invoke-model base URL
  WEBEVAL_MODEL             Model identifier
  WEBEVAL_PROVIDER          edgequake-llm provider (openai, anthropic, gemini, ollama, …)
  WEBEVAL_SCHEMA            Schema file (default: schema.json)
  OPENAI_API_KEY, …         Read by the chosen edgequake-llm provider
"#;

/// Evaluate the text quality of webpages with a hosted LLM.
#[derive(Parser, Debug)]
#[command(
    name = "webeval",
    version,
    about = "Evaluate the text quality of a webpage with a hosted LLM",
    long_about = "Fetch a webpage, keep the text of its paragraphs, spans and list items, ask \
a hosted LLM to fill in a JSON quality schema, and print the recovered JSON.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// URL to evaluate. Omit to be prompted.
    url: Option<String>,

    /// Keep prompting for URLs until EOF or "quit".
    #[arg(short, long)]
    interactive: bool,

    /// Model identifier.
    #[arg(long, env = "WEBEVAL_MODEL", default_value = edgequake_webeval::config::DEFAULT_MODEL_ID)]
    model: String,

    /// edgequake-llm provider name; when unset the Bedrock invoke endpoint is used.
    #[arg(long, env = "WEBEVAL_PROVIDER")]
    provider: Option<String>,

    /// Bedrock region.
    #[arg(long, env = "AWS_REGION", default_value = edgequake_webeval::config::DEFAULT_REGION)]
    region: String,

    /// Invoke-model base URL (overrides --region).
    #[arg(long, env = "WEBEVAL_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token for the invoke-model endpoint.
    #[arg(long, env = "AWS_BEARER_TOKEN_BEDROCK", hide_env_values = true)]
    api_token: Option<String>,

    /// Schema file describing the expected JSON fields.
    #[arg(long, env = "WEBEVAL_SCHEMA", default_value = edgequake_webeval::config::DEFAULT_SCHEMA_PATH)]
    schema: PathBuf,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "WEBEVAL_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max tokens the model may generate.
    #[arg(long, env = "WEBEVAL_MAX_GEN_LEN", default_value_t = 2048)]
    max_gen_len: u32,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "WEBEVAL_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Page download timeout in seconds (default: HTTP client default).
    #[arg(long, env = "WEBEVAL_FETCH_TIMEOUT")]
    fetch_timeout: Option<u64>,

    /// Model call timeout in seconds (default: HTTP client default).
    #[arg(long, env = "WEBEVAL_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,

    /// Also print the extracted page text.
    #[arg(long)]
    show_text: bool,

    /// Disable the spinner.
    #[arg(long, env = "WEBEVAL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "WEBEVAL_VERBOSE")]
    verbose: bool,

    /// Suppress everything except the result and errors.
    #[arg(short, long, env = "WEBEVAL_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep INFO logs out of
    // its way unless --verbose is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn EvaluationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let evaluator = Evaluator::from_config(config).context("Failed to set up the model client")?;

    if cli.interactive || cli.url.is_none() {
        return run_interactive(&cli, &evaluator).await;
    }

    let url = cli.url.as_deref().unwrap_or_default().trim();
    if url.is_empty() {
        anyhow::bail!("Please enter a valid URL.");
    }
    let report = evaluate_url(url, &evaluator).await;
    print_report(&cli, &report)?;

    if !report.outcome.is_completed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Prompt for URLs until EOF, `quit` or `exit`. Failures are printed and the
/// loop continues.
async fn run_interactive(cli: &Cli, evaluator: &Evaluator) -> Result<()> {
    if !cli.quiet {
        eprintln!("{}", bold("Website Text Quality Evaluator"));
        eprintln!(
            "{}",
            dim(&format!(
                "Evaluates the quality of text extracted from a website using {}.",
                evaluator.model_id()
            ))
        );
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("Enter the website URL: ");
        io::stderr().flush().ok();

        let Some(line) = lines.next() else { break };
        let line = line.context("Failed to read from stdin")?;
        let url = line.trim();

        if url.eq_ignore_ascii_case("quit") || url.eq_ignore_ascii_case("exit") {
            break;
        }
        if url.is_empty() {
            eprintln!("{}", red("Please enter a valid URL."));
            continue;
        }

        let report = evaluate_url(url, evaluator).await;
        if let Err(e) = print_report(cli, &report) {
            eprintln!("{} {e:#}", red("✗"));
        }
    }
    Ok(())
}

fn print_report(cli: &Cli, report: &EvaluationReport) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.json {
        let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
        writeln!(out, "{json}").context("Failed to write to stdout")?;
        return Ok(());
    }

    if cli.show_text && !report.page_text.is_empty() {
        writeln!(out, "### Extracted Text\n{}\n", report.page_text)
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        writeln!(out, "### Evaluation Result").context("Failed to write to stdout")?;
    }
    let shown = report.outcome.display();
    if report.outcome.is_completed() {
        writeln!(out, "{shown}").context("Failed to write to stdout")?;
    } else {
        writeln!(out, "{}", red(&shown)).context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        let s = &report.stats;
        let tokens = match (s.input_tokens, s.output_tokens) {
            (Some(i), Some(o)) => format!("  {i} tokens in / {o} tokens out"),
            _ => String::new(),
        };
        eprintln!(
            "{}",
            dim(&format!(
                "fetch {}ms  evaluate {}ms  total {}ms{}",
                s.fetch_duration_ms, s.evaluation_duration_ms, s.total_duration_ms, tokens
            ))
        );
    }
    Ok(())
}

/// Map CLI args to `EvaluatorConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<EvaluatorConfig> {
    let mut builder = EvaluatorConfig::builder()
        .model_id(cli.model.clone())
        .region(cli.region.clone())
        .schema_path(cli.schema.clone())
        .max_gen_len(cli.max_gen_len)
        .temperature(cli.temperature);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(ref token) = cli.api_token {
        builder = builder.api_token(token.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(secs) = cli.fetch_timeout {
        builder = builder.fetch_timeout_secs(secs);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
