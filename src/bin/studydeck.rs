//! CLI binary for studydeck.
//!
//! A thin shim over the library crate: `serve` starts the web form,
//! `generate` runs the pipeline once from the terminal, `inspect` lists the
//! cards in an existing deck.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use studydeck::config::{Environment, DEFAULT_MODEL, DEFAULT_PROVIDER};
use studydeck::deck::strip_html;
use studydeck::pipeline::input::load_document;
use studydeck::{
    export_json, import_json, read_deck, Deck, DeckFormat, DeckRequest, PipelineConfig,
    ServerConfig, StudyDeckService, PRESETS,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the web form on http://localhost:7860
  studydeck serve

  # Same, behind basic auth on another port
  USERNAME=me PASSWORD=secret studydeck serve --port 8080

  # Cards from two photographed pages
  studydeck generate page1.jpg page2.jpg --goal "Key terms of cell biology"

  # Use a preset and write to a chosen file
  studydeck generate lesson.pdf --preset spanish-vocabulary -n 20 -o spanish.apkg

  # Add cards to a deck you already have
  studydeck generate chapter2.pdf --goal "Dates and people" --extend history.apkg

  # List the cards inside a deck
  studydeck inspect history.apkg

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY       Gemini API key (copied to GEMINI_API_KEY if that is unset)
  STUDYDECK_PROVIDER   edgequake-llm provider name (default: gemini)
  MODEL_NAME           Model id (default: gemini-2.0-flash)
  TEMPERATURE          Generation temperature, 0.0–2.0 (default: 0.7)
  API_TIMEOUT_SECS     Per-call timeout (default: 120)
  MAX_RETRIES          Retries per upstream call (default: 0)
  HOST, PORT           Bind address for `serve` (default: 0.0.0.0:7860)
  USERNAME, PASSWORD   Enable basic auth for `serve` when both are set
  ENVIRONMENT          development | production (default: development)
  LOG_LEVEL            Log filter when RUST_LOG is unset

  A .env file in the working directory is loaded first.
"#;

/// Turn images and PDFs into Anki flashcard decks.
#[derive(Parser, Debug)]
#[command(
    name = "studydeck",
    version,
    about = "Turn images and PDFs into Anki flashcard decks using vision and language models",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    model: ModelArgs,

    /// development enables debug logs and detailed error pages.
    #[arg(long, env = "ENVIRONMENT", default_value = "development", global = true)]
    environment: String,

    /// Log filter (e.g. info, debug). RUST_LOG takes precedence.
    #[arg(long, env = "LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM provider understood by edgequake-llm.
    #[arg(long, env = "STUDYDECK_PROVIDER", default_value = DEFAULT_PROVIDER, global = true)]
    provider: String,

    /// Model id passed to the provider unchanged.
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL, global = true)]
    model: String,

    /// Generation temperature (0.0–2.0).
    #[arg(long, env = "TEMPERATURE", default_value_t = 0.7, global = true)]
    temperature: f32,

    /// Per-call timeout in seconds.
    #[arg(long, env = "API_TIMEOUT_SECS", default_value_t = 120, global = true)]
    api_timeout: u64,

    /// Retries per upstream call.
    #[arg(long, env = "MAX_RETRIES", default_value_t = 0, global = true)]
    max_retries: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web form.
    Serve(ServeArgs),
    /// Generate a deck from files or URLs.
    Generate(GenerateArgs),
    /// List the cards in an .apkg or .json deck.
    Inspect(InspectArgs),
    /// List the study-goal presets.
    Presets,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 7860)]
    port: u16,

    #[arg(long, env = "USERNAME", hide_env_values = true)]
    username: Option<String>,

    #[arg(long, env = "PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Maximum upload size per request, in MiB.
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 20)]
    max_upload_mb: usize,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Image/PDF paths or HTTP(S) URLs, read in order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// What you want to learn from the material.
    #[arg(short, long, default_value = "")]
    goal: String,

    /// Preset key (see `studydeck presets`); used when --goal is empty.
    #[arg(short, long)]
    preset: Option<String>,

    /// Number of cards to generate (1–50).
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..=50))]
    cards: Option<u32>,

    /// Deck name. Default: the extended deck's name or "AI Study Cards".
    #[arg(long, default_value = "")]
    deck_name: String,

    /// Existing .apkg whose cards are kept ahead of the new ones.
    #[arg(long)]
    extend: Option<PathBuf>,

    /// Let the model sharpen the goal from the material first.
    #[arg(long)]
    refine_goal: bool,

    /// Write JSON instead of .apkg.
    #[arg(long)]
    json: bool,

    /// Output file. Default: `<deck name>_<timestamp>.apkg` in the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable the spinner.
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Path to an .apkg (or a .json export).
    deck: PathBuf,

    /// Print the deck as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Both must happen before the runtime starts any threads.
    dotenvy::dotenv().ok();
    alias_google_api_key();

    let cli = Cli::parse();
    init_logging(&cli);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(run(cli))
}

/// The Gemini provider reads `GEMINI_API_KEY`; deployments often only set
/// `GOOGLE_API_KEY`.
fn alias_google_api_key() {
    if std::env::var_os("GEMINI_API_KEY").is_none() {
        if let Some(key) = std::env::var_os("GOOGLE_API_KEY") {
            std::env::set_var("GEMINI_API_KEY", key);
        }
    }
}

fn init_logging(cli: &Cli) {
    let environment = Environment::parse(&cli.environment);
    // The spinner gives all the feedback that matters during `generate`.
    let spinner_active = matches!(&cli.command, Command::Generate(g) if !g.no_progress);

    let level = if cli.verbose {
        "debug".to_string()
    } else if cli.quiet || (spinner_active && cli.log_level.is_none()) {
        "error".to_string()
    } else if let Some(ref level) = cli.log_level {
        level.clone()
    } else if environment.is_development() {
        "debug".to_string()
    } else {
        "info".to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("warn,studydeck={level},tower_http={level}"))
        }))
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve(ref args) => serve(&cli, args).await,
        Command::Generate(ref args) => generate(&cli, args).await,
        Command::Inspect(ref args) => inspect(args, cli.quiet),
        Command::Presets => {
            print_presets();
            Ok(())
        }
    }
}

/// Map model flags to `PipelineConfig`.
fn build_config(model: &ModelArgs) -> Result<PipelineConfig> {
    PipelineConfig::builder()
        .provider_name(&model.provider)
        .model(&model.model)
        .temperature(model.temperature)
        .api_timeout_secs(model.api_timeout)
        .max_retries(model.max_retries)
        .build()
        .context("Invalid configuration")
}

async fn serve(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let config = build_config(&cli.model)?;
    let service =
        StudyDeckService::from_config(config).context("Failed to initialise the model provider")?;

    let server = ServerConfig {
        host: args.host.clone(),
        port: args.port,
        environment: Environment::parse(&cli.environment),
        max_upload_bytes: args.max_upload_mb.max(1) * 1024 * 1024,
        ..ServerConfig::default()
    }
    .with_credentials(args.username.clone(), args.password.clone());

    studydeck::web::serve(service, server)
        .await
        .context("Server stopped with an error")
}

async fn generate(cli: &Cli, args: &GenerateArgs) -> Result<()> {
    let config = build_config(&cli.model)?;
    let service =
        StudyDeckService::from_config(config).context("Failed to initialise the model provider")?;

    let spinner = (!cli.quiet && !args.no_progress).then(new_spinner);
    let say = |msg: String| {
        if let Some(ref bar) = spinner {
            bar.set_message(msg);
        }
    };

    let mut documents = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        say(format!("Loading {input}…"));
        let doc = load_document(input, service.config().download_timeout_secs)
            .await
            .with_context(|| format!("Failed to load '{input}'"))?;
        documents.push(doc);
    }

    let existing_deck = match args.extend {
        Some(ref path) => Some(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read deck {}", path.display()))?,
        ),
        None => None,
    };

    say(format!(
        "Reading {} file(s) and writing cards…",
        documents.len()
    ));
    let request = DeckRequest {
        documents,
        goal: args.goal.clone(),
        preset: args.preset.clone(),
        num_cards: args.cards.map(|n| n as usize),
        deck_name: args.deck_name.clone(),
        existing_deck,
        refine_goal: args.refine_goal,
        format: if args.json { DeckFormat::Json } else { DeckFormat::Apkg },
    };
    let result = service.create_deck(request).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let generated = result.context("Deck generation failed")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&generated.artifact.file_name));
    tokio::fs::write(&output, &generated.artifact.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if !cli.quiet {
        eprintln!("{} {}", green("✔"), generated.status);
        eprintln!("{}", dim(&generated.preview));
        eprintln!("   {} {}", cyan("→"), bold(&output.display().to_string()));
    }
    Ok(())
}

fn new_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn inspect(args: &InspectArgs, quiet: bool) -> Result<()> {
    let deck = load_deck_file(&args.deck)?;

    if args.json {
        println!("{}", export_json(&deck));
        return Ok(());
    }

    if !quiet {
        println!("Deck:         {}", deck.name);
        if !deck.description.is_empty() {
            println!("Description:  {}", deck.description);
        }
        println!("Cards:        {}", deck.cards.len());
        println!();
    }
    for (i, card) in deck.cards.iter().enumerate() {
        println!("{:>3}. {}", i + 1, strip_html(&card.front));
        println!("     {}", dim(&strip_html(&card.back)));
    }
    Ok(())
}

fn load_deck_file(path: &Path) -> Result<Deck> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let text = String::from_utf8(bytes).context("Deck JSON is not valid UTF-8")?;
        return import_json(&text).context("Failed to parse deck JSON");
    }

    let read = read_deck(&bytes).context("Failed to read Anki package")?;
    Ok(Deck::new(&read.name, read.cards).with_description(read.description))
}

fn print_presets() {
    for preset in PRESETS {
        let summary = preset.description.lines().next().unwrap_or_default();
        println!("{:<22} {}", bold(preset.key), preset.title);
        println!("{:<22} {}", "", dim(summary));
    }
}
