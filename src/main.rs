//! Seatkeeper server: workspace seat pools and membership sagas.
//!
//! Main entry point that wires all crates together and keeps the TTL
//! store healthy until shutdown.

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use seatkeeper_cache::CacheManager;
use seatkeeper_client::Collaborators;
use seatkeeper_core::config::AppConfig;
use seatkeeper_core::error::AppError;
use seatkeeper_core::traits::cache::CacheProvider;
use seatkeeper_database::WorkspaceStores;
use seatkeeper_service::ServiceRegistry;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay and variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("SEATKEEPER_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("SEATKEEPER_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load_layered(&config_path, Some(&env))
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Seatkeeper v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Stores + migrations ──────────────────────────────
    tracing::info!(
        "Opening workspace store (provider: {})...",
        config.database.provider
    );
    let stores = WorkspaceStores::open(&config.database).await?;
    if let Some(database) = &stores.database {
        tracing::info!("Running database migrations...");
        seatkeeper_database::migration::run_migrations(database.pool()).await?;
        tracing::info!("Database migrations complete");
    }

    // ── Step 2: TTL store ────────────────────────────────────────
    tracing::info!(
        "Initializing cache (provider: {})...",
        config.cache.provider
    );
    let cache = CacheManager::new(&config.cache).await?;
    if !cache.health_check().await? {
        return Err(AppError::service_unavailable("Cache health check failed"));
    }
    tracing::info!("Cache initialized");

    // ── Step 3: Collaborators ────────────────────────────────────
    tracing::info!(
        "Connecting collaborators (mode: {})...",
        config.collaborators.mode
    );
    if config.collaborators.is_mock() {
        tracing::warn!("Mock collaborators selected; identity and billing are in-process fakes");
    }
    let collaborators = Collaborators::from_config(&config.collaborators)
        .map_err(|e| AppError::configuration(e.to_string()))?;

    // ── Step 4: Services ─────────────────────────────────────────
    let services = ServiceRegistry::new(
        stores.licenses.clone(),
        stores.members.clone(),
        cache.clone(),
        collaborators,
        &config.license,
    );
    tracing::debug!(?services, "Services initialized");

    // ── Step 5: Background sweeper ───────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = cache.spawn_sweeper(shutdown_rx);

    tracing::info!(
        invite_ttl_seconds = config.license.invite_ttl_seconds,
        authorization_ttl_seconds = config.license.authorization_ttl_seconds,
        "Seatkeeper ready"
    );

    // ── Step 6: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Some(handle) = sweeper_handle {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
    }
    if let Some(database) = &stores.database {
        database.close().await;
    }

    tracing::info!("Seatkeeper shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
}
