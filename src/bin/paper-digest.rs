//! CLI binary for edgequake-paper-digest.
//!
//! A thin shim over the library crate: `analyze` maps flags to
//! `AnalysisConfig` and drives an `AnalysisSession`; `serve` runs the
//! credential-holding proxy.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use edgequake_paper_digest::{
    export, Analysis, AnalysisConfig, AnalysisSession, OutputRecovery, ProcessingState,
    StateObserver, Status, Transport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Spinner observer ─────────────────────────────────────────────────────────

/// Terminal observer: one spinner whose prefix follows the session status.
struct SpinnerObserver {
    bar: ProgressBar,
    started: Instant,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }
}

impl StateObserver for SpinnerObserver {
    fn on_state(&self, state: &ProcessingState) {
        let name = state.file_name().unwrap_or("document");
        match state.status() {
            Status::Idle => {}
            Status::ReadingDocument => {
                self.bar.set_prefix("Reading");
                self.bar.set_message(name.to_string());
            }
            Status::Analyzing => {
                self.bar.set_prefix("Analyzing");
                self.bar.set_message("waiting for the model to finish reasoning…");
            }
            Status::Completed => {
                self.bar.finish_and_clear();
                eprintln!(
                    "{} {} analyzed in {:.1}s",
                    green("✔"),
                    bold(name),
                    self.started.elapsed().as_secs_f64()
                );
            }
            Status::Failed => {
                self.bar.finish_and_clear();
                eprintln!("{} {} could not be analyzed", red("✘"), bold(name));
            }
        }
    }

    fn on_text_extracted(&self, pages_read: usize, total_pages: usize, chars: usize) {
        self.bar.println(format!(
            "  {} {}/{} pages  {}",
            green("✓"),
            pages_read,
            total_pages,
            dim(&format!("{chars} chars")),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a local paper (Markdown on stdout)
  API_KEY=sk-... paper-digest analyze paper.pdf

  # WeChat-ready text, written to a file
  paper-digest analyze paper.pdf --format wechat -o digest.txt

  # Analyze from a URL, show the model's reasoning trace
  paper-digest analyze https://arxiv.org/pdf/2401.00001 --show-reasoning

  # Route through a proxy that holds the key
  paper-digest analyze paper.pdf --proxy http://127.0.0.1:8788/api/analyze

  # Use any edgequake-llm provider instead of the OpenAI-compatible endpoint
  paper-digest analyze paper.pdf --provider anthropic --model claude-sonnet-4-20250514

  # Run the proxy
  API_KEY=sk-... paper-digest serve --listen 0.0.0.0:8788

ENVIRONMENT VARIABLES:
  API_KEY                    Bearer key for the completion endpoint
  PAPER_DIGEST_ENDPOINT      OpenAI-compatible /chat/completions URL
  PAPER_DIGEST_MODEL         Model ID (default: deepseek-r1)
  PDFIUM_LIB_PATH            Path to libpdfium (default: system library)
  RUST_LOG                   Overrides -v / -q log filtering
"#;

/// Structured LLM analysis of scientific PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "paper-digest",
    version,
    about = "Structured LLM analysis of scientific PDFs",
    long_about = "Extract the text of a scientific PDF, ask a reasoning model (DeepSeek-R1 by \
default) for a five-section report including a phage display peptide technology analysis, and \
print it as Markdown, JSON or WeChat-ready text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAPER_DIGEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAPER_DIGEST_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a PDF file or URL.
    Analyze(AnalyzeArgs),
    /// Serve the credential-holding proxy.
    #[cfg(feature = "proxy")]
    Serve(ServeArgs),
}

/// Upstream model settings shared by `analyze` and `serve`.
#[derive(Args, Debug)]
struct ModelArgs {
    /// OpenAI-compatible chat-completions URL.
    #[arg(long, env = "PAPER_DIGEST_ENDPOINT", default_value = edgequake_paper_digest::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Model ID.
    #[arg(long, env = "PAPER_DIGEST_MODEL", default_value = edgequake_paper_digest::config::DEFAULT_MODEL)]
    model: String,

    /// Bearer key for the endpoint.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PAPER_DIGEST_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Do not send `response_format: json_object`.
    #[arg(long, env = "PAPER_DIGEST_NO_JSON_MODE")]
    no_json_mode: bool,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PAPER_DIGEST_TEMPERATURE")]
    temperature: Option<f32>,

    /// Completion token cap.
    #[arg(long, env = "PAPER_DIGEST_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Model request timeout in seconds.
    #[arg(long, env = "PAPER_DIGEST_API_TIMEOUT", default_value_t = 600)]
    api_timeout: u64,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    #[command(flatten)]
    model: ModelArgs,

    /// Send the text to this proxy instead of calling the endpoint directly.
    #[arg(long, env = "PAPER_DIGEST_PROXY", conflicts_with = "provider")]
    proxy: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "PAPER_DIGEST_PROVIDER")]
    provider: Option<String>,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "PAPER_DIGEST_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, env = "PAPER_DIGEST_FORMAT", value_enum, default_value = "markdown")]
    format: FormatArg,

    /// Print the model's reasoning trace to stderr.
    #[arg(long)]
    show_reasoning: bool,

    /// Maximum number of pages whose text is sent to the model.
    #[arg(long, env = "PAPER_DIGEST_MAX_PAGES", default_value_t = 10)]
    max_pages: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAPER_DIGEST_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Fall back to the first JSON object when the answer has a preamble.
    #[arg(long)]
    lenient: bool,

    /// Reject reports whose phage display section is empty.
    #[arg(long)]
    require_phage_section: bool,

    /// Disable the spinner.
    #[arg(long, env = "PAPER_DIGEST_NO_PROGRESS")]
    no_progress: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PAPER_DIGEST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[cfg(feature = "proxy")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "PAPER_DIGEST_LISTEN", default_value = "127.0.0.1:8788")]
    listen: std::net::SocketAddr,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Markdown,
    Json,
    Wechat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports progress; INFO logs would tear it.
    let spinner = match &cli.command {
        Command::Analyze(args) => !cli.quiet && !args.no_progress,
        #[cfg(feature = "proxy")]
        Command::Serve(_) => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner {
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

    match cli.command {
        Command::Analyze(args) => run_analyze(args, spinner && !cli.verbose, cli.quiet).await,
        #[cfg(feature = "proxy")]
        Command::Serve(args) => run_serve(args).await,
    }
}

async fn run_analyze(args: AnalyzeArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let config = build_config(&args).await?;

    let mut session = AnalysisSession::from_config(&config).context("Invalid configuration")?;
    if show_progress {
        session = session.with_observer(SpinnerObserver::new());
    }

    let state = session
        .submit_input(&args.input)
        .await
        .context("Session was not idle")?;

    if state.status() == Status::Failed {
        bail!(
            "{}",
            state
                .error()
                .unwrap_or(edgequake_paper_digest::state::GENERIC_FAILURE_MESSAGE)
        );
    }

    let analysis = Analysis {
        result: state
            .result()
            .cloned()
            .context("Completed analysis carried no result")?,
        reasoning: state.reasoning().map(str::to_string),
    };

    if args.show_reasoning {
        match analysis.reasoning {
            Some(ref r) => eprintln!("{}\n{}\n", cyan("◆ Reasoning"), dim(r.trim())),
            None => eprintln!("{}", dim("(the model returned no reasoning trace)")),
        }
    }

    let rendered = render(&analysis, args.format)?;
    match args.output {
        Some(ref path) => {
            write_atomic(path, &rendered).await?;
            if !quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
            if !rendered.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    Ok(())
}

#[cfg(feature = "proxy")]
async fn run_serve(args: ServeArgs) -> Result<()> {
    use edgequake_paper_digest::proxy::{self, ProxyState};

    let config = model_config(&args.model).await?.build()?;
    if config.api_key.is_none() {
        eprintln!(
            "{} API_KEY is not set; every request will be answered with 500 credential_missing",
            cyan("⚠")
        );
    }
    let state = ProxyState::from_config(&config)?;
    proxy::serve(args.listen, state)
        .await
        .with_context(|| format!("Proxy failed on {}", args.listen))
}

fn render(analysis: &Analysis, format: FormatArg) -> Result<String> {
    Ok(match format {
        FormatArg::Markdown => export::to_markdown(analysis),
        FormatArg::Json => {
            serde_json::to_string_pretty(analysis).context("Failed to serialise analysis")?
        }
        FormatArg::Wechat => export::to_wechat_article(&analysis.result),
    })
}

/// Write via a temp file and rename, so readers never see half a report.
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to move report to {}", path.display()))?;
    Ok(())
}

/// Upstream settings shared by both subcommands.
async fn model_config(args: &ModelArgs) -> Result<edgequake_paper_digest::AnalysisConfigBuilder> {
    let mut builder = AnalysisConfig::builder()
        .endpoint(&args.endpoint)
        .model(&args.model)
        .json_mode(!args.no_json_mode)
        .request_timeout_secs(args.api_timeout);

    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(t) = args.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = args.max_tokens {
        builder = builder.max_tokens(n);
    }
    Ok(builder)
}

/// Map `analyze` args to `AnalysisConfig`.
async fn build_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut builder = model_config(&args.model)
        .await?
        .max_pages(args.max_pages)
        .download_timeout_secs(args.download_timeout)
        .require_specialized_section(args.require_phage_section)
        .recovery(if args.lenient {
            OutputRecovery::FirstJsonObject
        } else {
            OutputRecovery::StripFences
        });

    if let Some(ref url) = args.proxy {
        builder = builder.transport(Transport::Proxy).proxy_url(url);
    }
    if let Some(ref name) = args.provider {
        builder = builder.provider_name(name);
    }
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd);
    }

    builder.build().context("Invalid configuration")
}
