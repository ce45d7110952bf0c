//! ClipScore evaluation service (clipscore-ev) - main entry point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipscore_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver,
};
use clipscore_common::db::init_database;
use clipscore_ev::services::quota_reset::sweep_loop;
use clipscore_ev::{build_router, AppState};

/// Command-line arguments for clipscore-ev
#[derive(Parser, Debug)]
#[command(name = "clipscore-ev")]
#[command(about = "Video evaluation rewards service")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "CLIPSCORE_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long, env = "CLIPSCORE_EV_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "CLIPSCORE_EV_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path("clipscore-ev"));
    let config = load_toml_config(&config_path).context("Failed to load config")?;

    let default_filter = format!(
        "clipscore_ev={level},clipscore_common={level},tower_http=info",
        level = config.logging.level
    );
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(
        "Starting ClipScore evaluation service (clipscore-ev) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path(&config.database_file);
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    if config.admin_token.is_none() {
        warn!("No admin_token configured: admin and webhook routes are unauthenticated");
    }

    let state = AppState::new(pool.clone(), config.admin_token.clone(), config.coherence_seed);
    let app = build_router(state);

    let sweep = tokio::spawn(sweep_loop(
        pool.clone(),
        Duration::from_secs(config.quota_sweep_interval_secs.max(1)),
    ));

    let host: std::net::IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid host address: {}", config.host))?;
    let addr = SocketAddr::new(host, args.port.unwrap_or(config.port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweep.abort();
    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
