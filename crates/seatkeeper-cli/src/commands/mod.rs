//! CLI command definitions and dispatch.

pub mod config;
pub mod invite;
pub mod license;
pub mod members;
pub mod migrate;

use clap::{Parser, Subcommand};

use seatkeeper_cache::CacheManager;
use seatkeeper_client::Collaborators;
use seatkeeper_core::config::AppConfig;
use seatkeeper_core::error::AppError;
use seatkeeper_database::WorkspaceStores;
use seatkeeper_service::ServiceRegistry;

use crate::output::OutputFormat;

/// Seatkeeper: workspace seat pools and memberships
#[derive(Debug, Parser)]
#[command(name = "seatkeeper", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Configuration inspection
    Config(config::ConfigArgs),
    /// Seat pool inspection
    License(license::LicenseArgs),
    /// Workspace member inspection
    Members(members::MembersArgs),
    /// Pending invitation lookup
    Invite(invite::InviteArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
            Commands::License(args) => license::execute(args, &self.config, self.format).await,
            Commands::Members(args) => members::execute(args, &self.config, self.format).await,
            Commands::Invite(args) => invite::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: build the service registry from configuration.
///
/// The in-memory store is process-local, so inspection commands only see
/// real state with `database.provider = "postgres"` and a shared cache.
pub async fn connect_services(config: &AppConfig) -> Result<ServiceRegistry, AppError> {
    if config.database.is_memory() {
        crate::output::print_warning("in-memory store selected; results will be empty");
    }
    let stores = WorkspaceStores::open(&config.database).await?;
    let cache = CacheManager::new(&config.cache).await?;
    let collaborators = Collaborators::from_config(&config.collaborators)
        .map_err(|e| AppError::configuration(e.to_string()))?;
    Ok(ServiceRegistry::new(
        stores.licenses,
        stores.members,
        cache,
        collaborators,
        &config.license,
    ))
}
