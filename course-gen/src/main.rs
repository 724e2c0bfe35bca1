//! course-gen - Textbook chapter generation service
//!
//! `serve` (default) runs the HTTP API; `generate` runs one chapter in-process
//! and prints it as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_common::config::{self as common_config, TomlConfig};
use course_gen::db::{self, CourseStore, SqliteCourseStore};
use course_gen::services::{
    AnthropicClient, ChapterOrchestrator, ChapterRequest, CoherenceChecker, GenerativeCall,
    LoggingProgressReporter, SectionGenerator,
};
use course_gen::AppState;

/// Command-line arguments for course-gen
#[derive(Parser, Debug)]
#[command(name = "course-gen")]
#[command(about = "Textbook chapter generation service")]
#[command(version)]
struct Cli {
    /// TOML config file (default: <config dir>/coursegen/course-gen.toml)
    #[arg(short, long, global = true, env = "COURSEGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long, env = "COURSEGEN_PORT")]
        port: Option<u16>,
    },
    /// Generate one chapter and print it as JSON
    Generate {
        /// Course owner
        #[arg(long, default_value = course_gen::api::DEFAULT_OWNER_ID)]
        owner: String,
        /// Course id
        #[arg(long)]
        course: String,
        /// Learning outcome id within the course
        #[arg(long)]
        outcome: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(common_config::default_config_path);
    let toml_config = common_config::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&toml_config.logging.level);

    info!("Starting course-gen");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config: {}", path.display());
    }

    let root_folder = common_config::resolve_root_folder(cli.root_folder.as_deref(), &toml_config);
    common_config::ensure_root_folder(&root_folder)
        .with_context(|| format!("Failed to initialize root folder {}", root_folder.display()))?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            let port = port.unwrap_or(toml_config.port);
            serve(&toml_config, &root_folder, port).await
        }
        Command::Generate {
            owner,
            course,
            outcome,
        } => generate(&toml_config, &root_folder, owner, course, outcome).await,
    }
}

fn init_tracing(configured_level: &str) {
    let default_filter = format!("course_gen={0},course_common={0},tower_http=info", configured_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn open_store(root_folder: &Path) -> Result<Arc<dyn CourseStore>> {
    let db_path = common_config::database_path(root_folder);
    info!("Database: {}", db_path.display());

    let pool = db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    Ok(Arc::new(SqliteCourseStore::new(pool)))
}

fn build_model(toml_config: &TomlConfig) -> Result<Arc<dyn GenerativeCall>> {
    let api_key = course_gen::config::resolve_llm_api_key(toml_config)?;
    let client = AnthropicClient::new(api_key, &toml_config.llm)
        .context("Failed to create model client")?;
    info!("Model: {}", client.model());
    Ok(Arc::new(client))
}

async fn serve(toml_config: &TomlConfig, root_folder: &Path, port: u16) -> Result<()> {
    let store = open_store(root_folder).await?;
    let model = build_model(toml_config)?;

    let state = AppState::new(model, store, &toml_config.generation);
    info!(
        max_concurrent_jobs = state.queue.max_concurrent(),
        "Generation queue initialized"
    );

    let app = course_gen::build_router(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn generate(
    toml_config: &TomlConfig,
    root_folder: &Path,
    owner_id: String,
    course_id: String,
    learning_outcome_id: String,
) -> Result<()> {
    let store = open_store(root_folder).await?;
    let model = build_model(toml_config)?;

    let orchestrator = ChapterOrchestrator::new(
        SectionGenerator::new(model),
        CoherenceChecker::new(toml_config.generation.redundancy_threshold),
        store,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        on_signal.cancel();
    });

    let request = ChapterRequest {
        owner_id,
        course_id,
        learning_outcome_id,
        task_id: None,
    };

    let chapter = orchestrator
        .run(&request, &LoggingProgressReporter, &cancel)
        .await
        .context("Chapter generation failed")?;

    println!("{}", serde_json::to_string_pretty(&chapter)?);
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
