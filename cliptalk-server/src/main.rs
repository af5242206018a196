// ClipTalk - speaks the text you give it, one utterance ahead

use anyhow::Context;
use clap::Parser;
use cliptalk_server::config::ClipTalkConfig;
use cliptalk_server::intake;
use cliptalk_server::supervisor::supervise;
use cliptalk_server::{create_router, Pipeline};
use cliptalk_spk::BackendTable;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cliptalk")]
#[command(about = "Text-to-speech pipeline that synthesizes ahead of the listener", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    #[arg(long, short)]
    port: Option<u16>,

    /// Default speech engine: cloud, native or piper
    #[arg(long)]
    engine: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Read texts from standard input, one per line
    #[arg(long)]
    stdin: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<ClipTalkConfig> {
    let mut config = match &cli.config {
        Some(path) => ClipTalkConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClipTalkConfig::default(),
    };
    config.apply_env()?;

    if let Some(host) = &cli.host {
        config.server.bind_address = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(engine) = &cli.engine {
        config.set_default_engine(engine)?;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &ClipTalkConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config);

    info!("Starting ClipTalk...");

    let backends = BackendTable::from_config(&config.speech)?;
    let pipeline = Pipeline::build(&config, backends);
    let state = pipeline.state.clone();

    let worker = pipeline.worker.clone();
    let _worker = supervise("synthesis worker", move || {
        let worker = worker.clone();
        async move { worker.run().await }
    });

    if cli.stdin {
        let intake = state.intake.clone();
        tokio::spawn(intake::read_lines(intake, tokio::io::stdin()));
        info!("Reading texts from standard input");
    }

    let address = config.server.socket_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    info!("Listening on http://{}", address);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!("ClipTalk stopped");
    Ok(())
}

/// Wait for shutdown signal
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
