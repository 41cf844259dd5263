use hub_sync::config::{Settings, load_config};
use hub_sync::error::HubSyncError;
use hub_sync::git::GitUpdater;
use hub_sync::logging::setup_logging;
use hub_sync::{AppState, build_router};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{self, info};

const DEFAULT_CONFIG_PATH: &str = "conf.json";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), HubSyncError> {
    dotenv::dotenv().ok();

    let config_path = PathBuf::from(
        std::env::var("HUB_SYNC_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    );

    let config = load_config(&config_path)?;
    let settings = Settings::from_reader(config.as_ref())?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = setup_logging(&settings.log)?;

    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| settings.bind_address());
    let updater = Arc::new(GitUpdater::new(settings.sync_timeout));
    info!("Using config at {:?}", config_path);
    info!(
        "Syncing pushes to '{}', pull timeout {:?}",
        settings.default_branch, settings.sync_timeout
    );

    let state = Arc::new(AppState::new(settings, config, updater));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on {}", bind_address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Signal received, starting graceful shutdown");
}
