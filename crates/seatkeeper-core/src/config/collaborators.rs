//! External collaborator endpoints and retry policy.

use serde::{Deserialize, Serialize};

/// Identity, billing and notification service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// `"http"` for real services, `"mock"` for in-process fakes.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Base URL of the account-identity service.
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
    /// Base URL of the billing/payment service.
    #[serde(default = "default_billing_url")]
    pub billing_url: String,
    /// Base URL of the notification (mail) service.
    #[serde(default = "default_notification_url")]
    pub notification_url: String,
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Bounded retry policy applied to every call.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            identity_url: default_identity_url(),
            billing_url: default_billing_url(),
            notification_url: default_notification_url(),
            timeout_seconds: default_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl CollaboratorConfig {
    /// Whether the in-process mock collaborators are selected.
    pub fn is_mock(&self) -> bool {
        self.mode.eq_ignore_ascii_case("mock")
    }
}

/// Fixed-count, fixed-backoff retry settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds.
    #[serde(default = "default_backoff")]
    pub backoff_millis: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_millis: default_backoff(),
        }
    }
}

fn default_mode() -> String {
    "http".to_string()
}

fn default_identity_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_billing_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_notification_url() -> String {
    "http://localhost:8083".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> u64 {
    200
}
