//! # seatkeeper-client
//!
//! Clients for the services Seatkeeper coordinates with but does not own:
//! - identity (user accounts)
//! - billing (recurring subscriptions)
//! - notification (templated email)
//!
//! Every HTTP call runs under a bounded [`RetryPolicy`]. The `mock` mode
//! swaps in in-memory implementations with failure injection.

pub mod billing;
pub mod error;
pub mod http;
pub mod identity;
pub mod mock;
pub mod notification;
pub mod retry;

use std::sync::Arc;

use tracing::info;

use seatkeeper_core::config::CollaboratorConfig;

pub use billing::BillingService;
pub use error::ClientError;
pub use identity::IdentityService;
pub use notification::{Notification, Notifier};
pub use retry::RetryPolicy;

/// The three collaborators a workflow may call.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Identity service.
    pub identity: Arc<dyn IdentityService>,
    /// Billing service.
    pub billing: Arc<dyn BillingService>,
    /// Notification service.
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Build the clients selected by `collaborators.mode`.
    pub fn from_config(config: &CollaboratorConfig) -> Result<Self, ClientError> {
        match config.mode.as_str() {
            "http" => {
                let retry = RetryPolicy::from_config(config);
                info!(
                    identity = %config.identity_url,
                    billing = %config.billing_url,
                    notification = %config.notification_url,
                    max_attempts = retry.max_attempts,
                    "Using HTTP collaborators"
                );
                Ok(Self {
                    identity: Arc::new(http::HttpIdentityService::new(
                        &config.identity_url,
                        retry,
                    )?),
                    billing: Arc::new(http::HttpBillingService::new(&config.billing_url, retry)?),
                    notifier: Arc::new(http::HttpNotifier::new(&config.notification_url, retry)?),
                })
            }
            "mock" => {
                info!("Using in-memory mock collaborators");
                Ok(Self {
                    identity: Arc::new(mock::MockIdentityService::new()),
                    billing: Arc::new(mock::MockBillingService::new()),
                    notifier: Arc::new(mock::MockNotifier::new()),
                })
            }
            other => Err(ClientError::Configuration(format!(
                "Unknown collaborator mode: '{other}'. Supported: http, mock"
            ))),
        }
    }
}
