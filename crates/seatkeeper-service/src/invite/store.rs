//! Pending invitations in the TTL store.
//!
//! Each invitation is stored under its member key
//! (`invite:{invitedUserId}-{workspaceId}`) and aliased by a session code
//! (`invite-code:{code}` → member key). Both entries share one TTL; once it
//! elapses neither is readable, which is an implicit rejection.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use seatkeeper_cache::CacheManager;
use seatkeeper_cache::keys;
use seatkeeper_core::config::LicenseConfig;
use seatkeeper_core::traits::cache::CacheProvider;
use seatkeeper_entity::invite::{InviteKey, PendingInvite};
use seatkeeper_entity::license::ProductSelection;
use seatkeeper_entity::workspace::WorkspaceRole;

use crate::code::{self, CodeGenerator};
use crate::error::LicenseError;

/// What an inviter asks for; the store fills in codes and timestamps.
#[derive(Debug, Clone)]
pub struct InviteDraft {
    /// Invited user.
    pub invitee_id: Uuid,
    /// Invited user's email.
    pub invitee_email: String,
    /// Target workspace.
    pub workspace_id: Uuid,
    /// Inviting user.
    pub inviter_id: Uuid,
    /// Role assigned on acceptance.
    pub role: WorkspaceRole,
    /// Products granted on acceptance.
    pub products: ProductSelection,
}

/// TTL-backed store of pending invitations.
#[derive(Debug, Clone)]
pub struct PendingInviteStore {
    cache: CacheManager,
    ttl: Duration,
    codes: CodeGenerator,
}

impl PendingInviteStore {
    /// Creates a new invite store.
    pub fn new(cache: CacheManager, config: &LicenseConfig) -> Self {
        Self {
            cache,
            ttl: Duration::from_secs(config.invite_ttl_seconds),
            codes: CodeGenerator::new(config.session_code_length),
        }
    }

    /// Lifetime of an invitation.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create or refresh the invitation for `(invitee, workspace)`.
    ///
    /// A re-sent invitation keeps its session code and creation time; its
    /// role, products and TTL are overwritten.
    pub async fn upsert(&self, draft: InviteDraft) -> Result<PendingInvite, LicenseError> {
        let key = keys::invite_member(draft.invitee_id, draft.workspace_id);
        let existing: Option<PendingInvite> = self.cache.get_json(&key).await?;
        let now = Utc::now();
        let (session_code, created_at) = match existing {
            Some(previous) => (previous.session_code, previous.created_at),
            None => (self.codes.generate(), now),
        };

        let invite = PendingInvite {
            invitee_id: draft.invitee_id,
            invitee_email: draft.invitee_email,
            workspace_id: draft.workspace_id,
            inviter_id: draft.inviter_id,
            role: draft.role,
            products: draft.products,
            session_code,
            created_at,
            updated_at: now,
            expires_at: code::expires_at(now, self.ttl),
        };

        self.cache.set_json(&key, &invite, self.ttl).await?;
        self.cache
            .set(&keys::invite_session(&invite.session_code), &key, self.ttl)
            .await?;

        info!(
            workspace_id = %invite.workspace_id,
            invitee_id = %invite.invitee_id,
            refreshed = created_at != now,
            "Invitation stored"
        );
        Ok(invite)
    }

    async fn member_key(&self, key: &InviteKey) -> Result<Option<String>, LicenseError> {
        match key {
            InviteKey::Member {
                user_id,
                workspace_id,
            } => Ok(Some(keys::invite_member(*user_id, *workspace_id))),
            InviteKey::Session { code } => Ok(self.cache.get(&keys::invite_session(code)).await?),
        }
    }

    /// Read a live invitation by either key form.
    pub async fn find(&self, key: &InviteKey) -> Result<Option<PendingInvite>, LicenseError> {
        let Some(member_key) = self.member_key(key).await? else {
            return Ok(None);
        };
        Ok(self.cache.get_json(&member_key).await?)
    }

    /// Atomically remove and return an invitation.
    ///
    /// At most one concurrent caller receives `Some`.
    pub async fn take(&self, key: &InviteKey) -> Result<Option<PendingInvite>, LicenseError> {
        let Some(member_key) = self.member_key(key).await? else {
            return Ok(None);
        };
        let invite: Option<PendingInvite> = self.cache.take_json(&member_key).await?;
        if let Some(invite) = &invite {
            self.cache
                .delete(&keys::invite_session(&invite.session_code))
                .await?;
            debug!(key = %key, "Invitation consumed");
        }
        Ok(invite)
    }

    /// Delete an invitation. Returns `false` if none was live.
    pub async fn delete(&self, key: &InviteKey) -> Result<bool, LicenseError> {
        Ok(self.take(key).await?.is_some())
    }

    /// Delete every pending invitation into a workspace.
    ///
    /// Session aliases are left to expire; they resolve to nothing once
    /// their member key is gone.
    pub async fn purge_workspace(&self, workspace_id: Uuid) -> Result<u64, LicenseError> {
        let purged = self
            .cache
            .delete_pattern(&keys::invite_workspace_pattern(workspace_id))
            .await?;
        info!(workspace_id = %workspace_id, purged, "Pending invitations purged");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatkeeper_cache::memory::MemoryCacheProvider;
    use seatkeeper_core::config::cache::MemoryCacheConfig;

    fn store() -> PendingInviteStore {
        let cache = CacheManager::in_memory(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        PendingInviteStore::new(cache, &LicenseConfig::default())
    }

    fn draft(workspace_id: Uuid, invitee_id: Uuid) -> InviteDraft {
        InviteDraft {
            invitee_id,
            invitee_email: "invitee@example.com".into(),
            workspace_id,
            inviter_id: Uuid::new_v4(),
            role: WorkspaceRole::Member,
            products: ProductSelection {
                remote: true,
                ..ProductSelection::default()
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_refresh_keeps_session_code() {
        let store = store();
        let (ws, user) = (Uuid::new_v4(), Uuid::new_v4());

        let first = store.upsert(draft(ws, user)).await.unwrap();
        let mut second_draft = draft(ws, user);
        second_draft.role = WorkspaceRole::Manager;
        let second = store.upsert(second_draft).await.unwrap();

        assert_eq!(first.session_code, second.session_code);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.role, WorkspaceRole::Manager);
        assert_eq!(second.session_code.len(), 20);
    }

    #[tokio::test]
    async fn test_both_key_forms_resolve_and_take_is_once() {
        let store = store();
        let (ws, user) = (Uuid::new_v4(), Uuid::new_v4());
        let invite = store.upsert(draft(ws, user)).await.unwrap();

        let by_code = InviteKey::session(invite.session_code.clone());
        assert_eq!(store.find(&by_code).await.unwrap(), Some(invite.clone()));
        assert_eq!(store.take(&by_code).await.unwrap(), Some(invite.clone()));
        assert_eq!(store.take(&invite.key()).await.unwrap(), None);
        assert_eq!(store.find(&by_code).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invite_expires_after_ttl() {
        let store = store();
        let (ws, user) = (Uuid::new_v4(), Uuid::new_v4());
        let invite = store.upsert(draft(ws, user)).await.unwrap();

        tokio::time::advance(store.ttl() - Duration::from_secs(1)).await;
        assert!(store.find(&invite.key()).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.find(&invite.key()).await.unwrap().is_none());
        assert!(
            store
                .find(&InviteKey::session(invite.session_code))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_purge_workspace() {
        let store = store();
        let ws = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.upsert(draft(ws, Uuid::new_v4())).await.unwrap();
        store.upsert(draft(ws, Uuid::new_v4())).await.unwrap();
        let kept = store.upsert(draft(other, Uuid::new_v4())).await.unwrap();

        assert_eq!(store.purge_workspace(ws).await.unwrap(), 2);
        assert!(store.find(&kept.key()).await.unwrap().is_some());
    }
}
