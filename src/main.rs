//! kfseq - keyframe sequence export service
//!
//! Converts timed pose keyframes from a web animator into Roblox
//! KeyframeSequence documents, either over HTTP or from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kfseq::{
    config::KfseqConfig,
    export::ExportRequest,
    sequence::encode_with_rig,
    server::ServerBuilder,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kfseq")]
#[command(version)]
#[command(about = "Keyframe sequence export service")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "KFSEQ_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP export service
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Encode a JSON export request into a document
    Encode {
        /// JSON file with `animation_name`, `rig_type` and `keyframes`
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("kfseq={},tower_http=info", log_level).into());
    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => KfseqConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => KfseqConfig::default(),
    };

    match cli.command {
        Commands::Serve { host, port } => {
            run_server(config, host, port).await?;
        }
        Commands::Encode { input, output } => {
            run_encode(&input, output.as_deref())?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_server(config: KfseqConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut builder = ServerBuilder::new().config(config);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }
    let server = builder.build().await?;

    server.serve(shutdown_signal()).await?;
    tracing::info!("kfseq stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn run_encode(input: &std::path::Path, output: Option<&std::path::Path>) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let request: ExportRequest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    request.validate()?;

    let document = encode_with_rig(
        request.display_name(),
        request.rig_type.as_deref(),
        &request.keyframes,
    )?;
    let xml = document.render();

    match output {
        Some(path) => {
            std::fs::write(path, &xml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                time_nodes = document.keyframes.len(),
                poses = document.pose_count(),
                "Wrote keyframe sequence"
            );
        }
        None => println!("{}", xml),
    }
    Ok(())
}

fn show_config(config: Option<&KfseqConfig>) -> Result<()> {
    let default_config = KfseqConfig::default();
    let config = config.unwrap_or(&default_config);
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}
