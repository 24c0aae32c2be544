//! Storage selection by `database.provider`.

use std::sync::Arc;

use tracing::info;

use seatkeeper_core::config::DatabaseConfig;
use seatkeeper_core::error::AppError;

use crate::connection::DatabasePool;
use crate::memory::MemoryWorkspaceStore;
use crate::repositories::{LicenseRepository, MembershipRepository};
use crate::store::{LicenseStore, MembershipStore};

/// The configured license and membership stores.
#[derive(Debug, Clone)]
pub struct WorkspaceStores {
    /// Seat pool store.
    pub licenses: Arc<dyn LicenseStore>,
    /// Membership store.
    pub members: Arc<dyn MembershipStore>,
    /// PostgreSQL pool backing the stores, if any.
    pub database: Option<DatabasePool>,
}

impl WorkspaceStores {
    /// Open the stores named by `config.provider`.
    ///
    /// Migrations are not run here; see [`crate::migration::run_migrations`].
    pub async fn open(config: &DatabaseConfig) -> Result<Self, AppError> {
        match config.provider.as_str() {
            "postgres" => {
                let database = DatabasePool::connect(config).await?;
                let pg = database.pool().clone();
                Ok(Self {
                    licenses: Arc::new(LicenseRepository::new(pg.clone())),
                    members: Arc::new(MembershipRepository::new(pg)),
                    database: Some(database),
                })
            }
            "memory" => {
                info!("Using in-memory workspace store; state is lost on exit");
                Ok(Self::in_memory(MemoryWorkspaceStore::new()))
            }
            other => Err(AppError::configuration(format!(
                "Unknown database provider: '{other}'. Supported: postgres, memory"
            ))),
        }
    }

    /// Wrap a single in-memory store serving both roles.
    pub fn in_memory(store: MemoryWorkspaceStore) -> Self {
        Self {
            licenses: Arc::new(store.clone()),
            members: Arc::new(store),
            database: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_provider_is_rejected() {
        let config = DatabaseConfig {
            provider: "sqlite".into(),
            ..DatabaseConfig::default()
        };
        let err = WorkspaceStores::open(&config).await.unwrap_err();
        assert_eq!(err.kind, seatkeeper_core::error::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_memory_provider_needs_no_url() {
        let config = DatabaseConfig {
            provider: "memory".into(),
            url: String::new(),
            ..DatabaseConfig::default()
        };
        let stores = WorkspaceStores::open(&config).await.unwrap();
        assert!(stores.database.is_none());
    }
}
