//! sst-cache - renders session reports for the dashboard
//!
//! # Usage
//!
//! ```bash
//! # Store a decoded session
//! sst-cache --database ./data/sst.db import --file session.json --session 12
//!
//! # Render one session
//! sst-cache --database ./data/sst.db process --session 12
//!
//! # Render every session id pushed to the queue
//! sst-cache serve --address 0.0.0.0:5555 --lod 5 --hst 350
//! ```
//!
//! # Environment Variables
//!
//! - `SST_CONFIG`: Path to the analysis config (default: ./sst_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use sst_analysis::cache::{
    CacheWorker, JobSource, SessionId, SessionRecord, SessionStore, SingleSession, SledStore,
    TcpJobSource, WorkerStats,
};
use sst_analysis::config::AnalysisConfig;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "sst-cache")]
#[command(about = "Suspension telemetry cache generator")]
#[command(version)]
struct CliArgs {
    /// Session database (overrides [storage] database)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Analysis config file; failing to load it is fatal
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Level of detail for rendered traces (overrides [render] lod)
    #[arg(short, long, global = true)]
    lod: Option<usize>,

    /// High speed threshold in mm/s (overrides [velocity] high_speed_threshold_mm_s)
    #[arg(short = 't', long, global = true)]
    hst: Option<f64>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Render the cache of one session
    Process {
        #[arg(short, long)]
        session: SessionId,
    },

    /// Listen for session ids and render each one
    Serve {
        /// Listen address (overrides [server] queue_addr)
        #[arg(short, long, value_name = "HOST:PORT")]
        address: Option<String>,
    },

    /// Store a decoded session record (JSON) under an id
    Import {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        session: SessionId,
    },
}

fn load_config(args: &CliArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::load(),
    };

    if let Some(lod) = args.lod {
        config.render.lod = lod;
    }
    if let Some(hst) = args.hst {
        config.velocity.high_speed_threshold_mm_s = hst;
    }
    if let Some(database) = &args.database {
        config.storage.database = database.clone();
    }
    config.validate().context("Invalid command line overrides")?;
    Ok(config)
}

fn open_store(config: &AnalysisConfig) -> Result<SledStore> {
    let path = &config.storage.database;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    SledStore::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}

async fn run_worker<J: JobSource>(
    config: AnalysisConfig,
    store: SledStore,
    mut source: J,
    cancel_token: CancellationToken,
) -> Result<WorkerStats> {
    let worker = CacheWorker::new(store, config);
    let stats = worker.run(&mut source, cancel_token).await;
    let store = worker.store();
    store.flush()?;
    info!(
        cached = store.cached_count(),
        size_bytes = store.size_bytes(),
        "Database flushed"
    );
    Ok(stats)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    let store = open_store(&config)?;

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    match args.command {
        SubCommand::Import { file, session } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let record: SessionRecord = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid session record {}", file.display()))?;
            record
                .telemetry
                .validate()
                .with_context(|| format!("Session {session} is unusable"))?;
            store.put_session(session, &record)?;
            store.flush()?;
            info!(session_id = session, name = %record.name, "Session imported");
        }
        SubCommand::Process { session } => {
            info!(session_id = session, lod = config.render.lod, "Processing one session");
            let stats =
                run_worker(config, store, SingleSession::new(session), cancel_token).await?;
            if stats.failed > 0 {
                bail!("Cache generation failed for session {session}");
            }
        }
        SubCommand::Serve { address } => {
            let addr = address.unwrap_or_else(|| config.server.queue_addr.clone());
            let source = TcpJobSource::bind(&addr).await?;
            let stats = run_worker(config, store, source, cancel_token).await?;
            info!(
                processed = stats.processed,
                failed = stats.failed,
                "Serve loop finished"
            );
        }
    }

    Ok(())
}
