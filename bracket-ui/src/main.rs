//! bracket-ui - Bracket voting web service
//!
//! Presents a 16-entrant bracket, collects round-by-round winner picks and
//! stores every decided matchup in the configured prediction store.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use bracket_common::config::{LoggingConfig, ServiceConfig, TomlConfig};
use bracket_common::db::connect_driver;
use bracket_common::PersistenceGateway;
use bracket_ui::{build_router, AppState, SessionRegistry};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Upper bound on how often idle sessions are swept
const MAX_REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Command-line arguments for bracket-ui
#[derive(Parser, Debug)]
#[command(name = "bracket-ui")]
#[command(about = "Bracket voting web service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root folder for the SQLite database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "BRACKET_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The config file also carries the log level, so read it before tracing
    // starts and report any problem once logging is up.
    let loaded = TomlConfig::discover(args.config.as_deref());
    let logging = match &loaded {
        Ok((toml, _)) => toml.logging.clone(),
        Err(_) => LoggingConfig::default(),
    };
    init_tracing(&logging)?;

    info!(
        "Starting bracket-ui v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = match loaded.and_then(|(toml, path)| {
        if let Some(path) = &path {
            info!("Config file: {}", path.display());
        }
        ServiceConfig::resolve(toml, args.root_folder.as_deref(), args.port)
    }) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            error!("Startup halted; fix the configuration and restart");
            return Err(e).context("Invalid configuration");
        }
    };

    config.ensure_root_folder()?;
    info!("Root folder: {}", config.root_folder.display());

    let driver = match connect_driver(&config.database).await {
        Ok(driver) => driver,
        Err(e) => {
            error!("Failed to connect to prediction store: {}", e);
            return Err(e).context("Prediction store unavailable");
        }
    };

    let gateway = PersistenceGateway::new(driver);
    gateway
        .ensure_schema()
        .await
        .context("Failed to prepare predictions table")?;
    info!("✓ Prediction store ready ({})", gateway.driver_name());

    let state = AppState::new(gateway, config.entrants.clone(), config.title.clone());
    spawn_session_reaper(state.sessions.clone(), config.idle_timeout);

    let app = build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("bracket-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber; RUST_LOG overrides the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "bracket_ui={level},bracket_common={level},tower_http={level}",
            level = logging.level
        ))
    });

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

/// Periodically drop sessions nobody has touched for `idle_timeout`
fn spawn_session_reaper(sessions: SessionRegistry, idle_timeout: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(idle_timeout.min(MAX_REAP_INTERVAL));
        loop {
            ticker.tick().await;
            let reaped = sessions.reap_idle(idle_timeout).await;
            if reaped > 0 {
                info!("Discarded {} idle session(s)", reaped);
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Ctrl+C handler unavailable: {}", e);
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
                warn!("SIGTERM handler unavailable: {}", e);
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
