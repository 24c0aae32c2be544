//! Account model returned by the identity service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account owned by the external identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque user identifier.
    pub id: Uuid,
    /// Login email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a member account in bulk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    /// Login email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Workspace the account is provisioned for.
    pub workspace_id: Uuid,
}
