//! voxquery application binary - composition root.
//!
//! Ties the voxquery crates into one interactive session:
//! 1. Parse CLI args and load configuration (file only when named)
//! 2. Initialize logging
//! 3. Build the completion backend and translation engine
//! 4. Build the capture step (microphone + Whisper, or typed input)
//! 5. Run the session loop until the operator stops

mod cli;
mod terminal;

use std::time::Duration;

use clap::Parser;

use voxquery_audio::{ListenConfig, Listener, MicrophoneCapture, MicrophoneConfig, MicrophoneSource};
use voxquery_chat::{PromptComposer, QueryValidator, TranslationEngine};
use voxquery_core::config::VoxQueryConfig;
use voxquery_llm::openai::api_key_from_env;
use voxquery_llm::OpenAiCompatibleBackend;
use voxquery_session::{SessionController, SessionSummary, TurnBounds};
use voxquery_whisper::{WhisperConfig, WhisperService};

use cli::CliArgs;
use terminal::{SharedLines, TerminalOperator, TypedCapture};

type Engine = TranslationEngine<OpenAiCompatibleBackend>;
type Terminal = TerminalOperator<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

fn init_tracing(args: &CliArgs, config: &VoxQueryConfig) {
    let filter = match args.resolve_log_level(&config.general.log_level) {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &CliArgs) -> Result<VoxQueryConfig, Box<dyn std::error::Error>> {
    let mut config = match args.resolve_config_path() {
        Some(path) => VoxQueryConfig::load(&path)
            .map_err(|e| format!("failed to load config {}: {}", path.display(), e))?,
        None => VoxQueryConfig::default(),
    };
    args.apply_overrides(&mut config);
    Ok(config)
}

fn build_engine(config: &VoxQueryConfig) -> Result<Engine, Box<dyn std::error::Error>> {
    let api_key = api_key_from_env(&config.completion.api_key_env)?;
    let backend = OpenAiCompatibleBackend::from_config(&config.completion, api_key)?;
    tracing::info!(
        model = %backend.model(),
        base_url = %backend.base_url(),
        "Completion backend ready"
    );

    Ok(TranslationEngine::new(
        backend,
        PromptComposer::new(config.session.system_prompt.clone()),
        QueryValidator::default(),
        Duration::from_secs(config.completion.timeout_secs),
    ))
}

/// Run the session with microphone capture and Whisper transcription.
async fn run_spoken(
    config: &VoxQueryConfig,
    engine: Engine,
    operator: Terminal,
    bounds: TurnBounds,
) -> Result<SessionSummary, Box<dyn std::error::Error>> {
    let whisper = WhisperService::new(WhisperConfig::from(&config.whisper))?;
    let source = MicrophoneSource::open(MicrophoneConfig::from(&config.capture))
        .map_err(|e| format!("{e} (run with --typed to type requests instead)"))?;
    let capture = MicrophoneCapture::new(
        source,
        Listener::new(ListenConfig::from(&config.capture)),
        whisper,
    );

    let mut session = SessionController::new(capture, engine, operator, bounds);
    Ok(session.run().await?)
}

/// Run the session reading requests from the keyboard.
async fn run_typed(
    lines: SharedLines<tokio::io::BufReader<tokio::io::Stdin>>,
    engine: Engine,
    operator: Terminal,
    bounds: TurnBounds,
) -> Result<SessionSummary, Box<dyn std::error::Error>> {
    let capture = TypedCapture::new(lines, tokio::io::stdout());
    let mut session = SessionController::new(capture, engine, operator, bounds);
    Ok(session.run().await?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_tracing(&args, &config);

    tracing::info!("Starting voxquery v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(config = ?config, "Configuration resolved");

    let engine = build_engine(&config)?;
    let bounds = TurnBounds::from(&config.capture);
    let lines = SharedLines::stdin();
    let operator = TerminalOperator::new(lines.clone(), tokio::io::stdout());

    let summary = if args.typed {
        run_typed(lines, engine, operator, bounds).await?
    } else {
        run_spoken(&config, engine, operator, bounds).await?
    };

    tracing::debug!(
        turns = summary.turns,
        successes = summary.successes,
        "voxquery exiting"
    );
    Ok(())
}
