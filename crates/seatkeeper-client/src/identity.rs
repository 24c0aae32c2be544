//! Identity collaborator: user accounts owned by the account service.

use async_trait::async_trait;
use uuid::Uuid;

use seatkeeper_entity::account::{Account, NewAccount};

use crate::error::ClientError;

/// Account lookups and lifecycle calls against the identity service.
///
/// An unreachable service is reported as [`ClientError::Unavailable`],
/// never as an empty result, so callers cannot mistake an outage for
/// "no such user".
#[async_trait]
pub trait IdentityService: Send + Sync + std::fmt::Debug {
    /// Resolve an account by identifier.
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Account>, ClientError>;

    /// Resolve an account by login email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, ClientError>;

    /// Resolve a batch of accounts. Unknown identifiers are omitted.
    async fn list_accounts(&self, user_ids: &[Uuid]) -> Result<Vec<Account>, ClientError>;

    /// Create an account.
    async fn create_account(&self, account: &NewAccount) -> Result<Account, ClientError>;

    /// Delete an account.
    async fn delete_account(&self, user_id: Uuid) -> Result<(), ClientError>;
}
