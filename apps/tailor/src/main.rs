use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tailor::cli::{Cli, Commands, GenerateArgs};
use tailor::config::Config;
use tailor::errors::ResumeError;
use tailor::jobs::queue::JobQueue;
use tailor::jobs::store::{InMemoryJobStore, JobStore, RedisJobStore};
use tailor::llm_client::retry::Retrying;
use tailor::llm_client::{LlmClient, TextGenerator};
use tailor::pipeline::Pipeline;
use tailor::routes::build_router;
use tailor::state::AppState;

/// Exit code for configuration and startup failures.
const EXIT_STARTUP: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration first; nothing runs without an API key
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let pipeline = match build_pipeline(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Startup failed: {e:#}");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    match cli.command {
        Commands::Generate(args) => match run_generate(pipeline, args).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{} stage failed: {e}", e.stage());
                eprintln!("Error [{}] ({} stage): {e}", e.code(), e.stage());
                ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(EXIT_STARTUP))
            }
        },
        Commands::Serve { host, port } => match serve(pipeline, host, port).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Server error: {e:#}");
                ExitCode::from(EXIT_STARTUP)
            }
        },
    }
}

fn build_pipeline(config: Config) -> Result<Pipeline> {
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.anthropic_api_url.clone(),
        config.generation_timeout(),
    )
    .context("failed to build HTTP client")?;
    info!(
        "LLM client initialized (model: {}, max attempts: {})",
        tailor::llm_client::MODEL,
        config.llm_max_attempts
    );

    let generator: Arc<dyn TextGenerator> = Arc::new(Retrying::new(llm, config.llm_max_attempts));
    Ok(Pipeline::new(generator, Arc::new(config)))
}

async fn run_generate(pipeline: Pipeline, args: GenerateArgs) -> Result<(), ResumeError> {
    let input = args.into_input().await?;
    let artifact = pipeline.run(input).await?;

    println!("{}", artifact.passage);
    println!();
    println!("Saved: {}", artifact.path.display());
    if let Some(letter) = &artifact.cover_letter_path {
        println!("Cover letter: {}", letter.display());
    }
    if let Some(pdf) = &artifact.pdf_path {
        println!("PDF:   {}", pdf.display());
    }
    for warning in &artifact.warnings {
        eprintln!("Warning: {warning}");
    }
    Ok(())
}

async fn serve(pipeline: Pipeline, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = pipeline.config().clone();
    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Job store: Redis when configured, otherwise process memory
    let store: Arc<dyn JobStore> = match &config.redis_url {
        Some(url) => {
            let store = RedisJobStore::connect(url)
                .await
                .context("failed to connect to Redis")?;
            info!("Redis job store initialized");
            Arc::new(store)
        }
        None => {
            info!("In-memory job store initialized (REDIS_URL not set)");
            Arc::new(InMemoryJobStore::new())
        }
    };

    let jobs = JobQueue::start(pipeline.clone(), store, config.worker_count);
    let state = AppState { pipeline, jobs };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let host = host.unwrap_or(config.host);
    let port = port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
