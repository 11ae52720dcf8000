//! Dataset Chat CLI - main entry point

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dataset_chat::api::RemotePipeline;
use dataset_chat::{commands, metrics, Config, LocalPipeline, Orchestrator};
use tracing::warn;

#[derive(Parser)]
#[command(name = "dataset_chat")]
#[command(about = "Chat with open government datasets", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Configuration file (defaults to config.yml, then ../config.yml)
    #[arg(short, long, env = "DATASET_CHAT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the pipeline stages as an HTTP API
    Serve {
        /// Listen address (overrides server.addr)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Interactive chat in the terminal
    Chat {
        /// Base URL of a running `serve` instance; runs in-process when omitted
        #[arg(long)]
        remote: Option<String>,

        /// Run the user's input on the code execution service after each answer
        #[arg(long, default_value_t = false)]
        interpret: bool,
    },

    /// Answer a single question and exit
    Ask {
        /// The question
        question: String,

        /// Base URL of a running `serve` instance
        #[arg(long)]
        remote: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("dataset_chat=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::new(),
    };

    execute_command(cli.command, config).await
}

async fn execute_command(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Serve { addr } => commands::serve::run(&config, addr.as_deref()).await,
        Commands::Chat { remote, interpret } => match remote {
            Some(url) => {
                let pipeline = RemotePipeline::new(url)?.with_interpreter(interpret);
                commands::chat::run(Orchestrator::new(pipeline)).await
            }
            None => {
                let mut config = config;
                config.interpreter_enabled |= interpret;
                let pipeline = LocalPipeline::from_config(&config)?;
                commands::chat::run(Orchestrator::new(pipeline)).await
            }
        },
        Commands::Ask { question, remote } => match remote {
            Some(url) => {
                let orchestrator = Orchestrator::new(RemotePipeline::new(url)?);
                commands::chat::ask(&orchestrator, &question).await
            }
            None => {
                let orchestrator = Orchestrator::new(LocalPipeline::from_config(&config)?);
                commands::chat::ask(&orchestrator, &question).await
            }
        },
    }
}
