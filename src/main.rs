//! status-list-server - status list index allocation and distribution

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use status_list_server::api::{create_router, AppState};
use status_list_server::background::BackgroundConfig;
use status_list_server::config::{CacheConfig, Config};
use status_list_server::service::StatusListService;
use status_list_server::stats::TracingStats;
use status_list_server::storage::open_backend;
use status_list_server::tokens::FileTokenRepository;
use status_list_server::traits::{StatsSink, TokenRepository};

#[derive(Parser, Debug)]
#[command(name = "status-list-server")]
#[command(about = "Status list index allocation and distribution server")]
struct Args {
    /// Host to bind to
    #[arg(long, env = "SLS_SERVER_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(long, env = "SLS_SERVER_PORT", default_value = "8090")]
    port: u16,

    /// Base URL of published lists (list uri = <public-url>/<list id>)
    #[arg(long, env = "SLS_PUBLIC_URL", default_value = "http://localhost:8090")]
    public_url: String,

    /// Root directory of token artifacts
    #[arg(long, env = "SLS_STORAGE_DIRECTORY", default_value = "./status-lists")]
    storage_directory: PathBuf,

    /// Path to SQLite database
    #[arg(long, env = "SLS_DATABASE_PATH", default_value = "./status-list.db")]
    database: String,

    /// TOML file with the [pools.<id>] definitions
    #[arg(long, env = "SLS_POOLS_FILE")]
    pools_file: PathBuf,

    /// Log level / tracing filter directives
    #[arg(long, env = "SLS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Idle time after which cached artifacts are dropped (seconds)
    #[arg(long, env = "SLS_CACHE_DURATION_SECS", default_value = "3600")]
    cache_duration_secs: u64,

    /// Period of the cache sweep (seconds)
    #[arg(long, env = "SLS_CACHE_SWEEP_INTERVAL_SECS", default_value = "3600")]
    cache_sweep_interval_secs: u64,

    /// Upper bound on cached artifacts
    #[arg(long, env = "SLS_CACHE_MAX_ENTRIES", default_value = "10000")]
    cache_max_entries: usize,

    /// Period of the revival job (seconds)
    #[arg(long, env = "SLS_REVIVAL_INTERVAL_SECS", default_value = "3600")]
    revival_interval_secs: u64,

    /// Attempts for a status write that keeps conflicting
    #[arg(long, env = "SLS_RETRY_ATTEMPTS", default_value = "10")]
    retry_attempts: u32,

    /// Fixed backoff between write attempts (milliseconds)
    #[arg(long, env = "SLS_RETRY_BACKOFF_MS", default_value = "500")]
    retry_backoff_ms: u64,

    /// Do not start background jobs
    #[arg(long, env = "SLS_BACKGROUND_DISABLED", default_value = "false")]
    background_disabled: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let pools = Config::load_pools(&self.pools_file)?;
        let config = Config {
            host: self.host,
            port: self.port,
            public_url: self.public_url,
            storage_directory: self.storage_directory,
            database_path: self.database,
            log_level: self.log_level,
            cache: CacheConfig {
                duration_secs: self.cache_duration_secs,
                sweep_interval_secs: self.cache_sweep_interval_secs,
                max_entries: self.cache_max_entries,
            },
            revival_interval_secs: self.revival_interval_secs,
            retry_attempts: self.retry_attempts,
            retry_backoff_ms: self.retry_backoff_ms,
            pools,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();
    let background_disabled = args.background_disabled;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting status-list-server v{}", env!("CARGO_PKG_VERSION"));

    let config = args.into_config().context("invalid configuration")?;
    if config.pools.is_empty() {
        tracing::warn!("No pools configured");
    }

    let storage = open_backend(&config).context("failed to open storage backend")?;
    let tokens: Arc<dyn TokenRepository> = Arc::new(
        FileTokenRepository::new(&config.storage_directory)
            .context("failed to open token storage directory")?,
    );
    let stats = Arc::new(TracingStats::new());

    let mut background = BackgroundConfig::from_config(&config);
    background.disabled = background_disabled;

    let service = Arc::new(
        StatusListService::start(
            &config,
            storage,
            tokens,
            Arc::clone(&stats) as Arc<dyn StatsSink>,
            background,
        )
        .await
        .context("failed to start status list service")?,
    );

    let router = create_router(Arc::new(AppState {
        service: Arc::clone(&service),
        stats,
    }));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(address = %addr, public_url = %config.base_url(), "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Return buffered indices before exiting
    service.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    tracing::info!("Shutdown signal received");
}
