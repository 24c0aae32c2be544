//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod cache;
pub mod collaborators;
pub mod database;
pub mod license;
pub mod logging;

use serde::{Deserialize, Serialize};

pub use self::cache::CacheConfig;
pub use self::collaborators::{CollaboratorConfig, RetryConfig};
pub use self::database::DatabaseConfig;
pub use self::license::{LicenseConfig, ProductAllowance, ProductAllowances, ResourceCeilings};
pub use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay + `SEATKEEPER__*` variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Relational store settings.
    pub database: DatabaseConfig,
    /// TTL store settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Seat pool, invite and authorization settings.
    #[serde(default)]
    pub license: LicenseConfig,
    /// Identity, billing and notification endpoints.
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file plus `SEATKEEPER__*` variables.
    pub fn load(path: &str) -> Result<Self, AppError> {
        Self::load_layered(path, None)
    }

    /// Load the base file, an optional environment overlay
    /// (`config/<env>.toml`), then environment variables.
    pub fn load_layered(path: &str, env: Option<&str>) -> Result<Self, AppError> {
        let mut builder =
            config::Config::builder().add_source(config::File::with_name(path).required(false));

        if let Some(env) = env {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{env}")).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("SEATKEEPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let raw = r#"
            [database]
            url = "postgres://localhost/seatkeeper"
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database.provider, "postgres");
        assert_eq!(config.cache.provider, "memory");
        assert_eq!(config.license.invite_ttl_seconds, 7 * 24 * 60 * 60);
        assert_eq!(config.license.authorization_ttl_seconds, 30 * 60);
        assert_eq!(config.collaborators.retry.max_attempts, 3);
        assert_eq!(config.logging.level, "info");
    }
}
