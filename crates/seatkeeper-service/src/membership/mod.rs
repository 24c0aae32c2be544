//! Membership workflows spanning the seat pool, the TTL store and the
//! external collaborators.
//!
//! Each workflow that mutates more than one system runs as a [`Saga`]:
//! seats are granted in product order and unwound in reverse if a later
//! step fails.
//!
//! [`Saga`]: crate::saga::Saga

pub mod departure;
pub mod invitation;
pub mod listing;
pub mod provisioning;
pub mod revision;
pub mod secession;

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use seatkeeper_client::{Collaborators, Notification};
use seatkeeper_database::store::MembershipStore;
use seatkeeper_entity::license::Product;
use seatkeeper_entity::workspace::{MemberFilter, Membership};

use crate::context::RequestContext;
use crate::error::LicenseError;
use crate::invite::PendingInviteStore;
use crate::pool::LicensePoolManager;
use crate::saga::Saga;

pub use departure::DepartureReport;
pub use invitation::InviteRequest;
pub use listing::MemberView;
pub use provisioning::{ProvisionRequest, ProvisionedAccount};
pub use secession::SecessionReport;

/// Orchestrates invite, accept, revision, departure, provisioning and
/// secession workflows.
#[derive(Debug, Clone)]
pub struct MembershipOrchestrator {
    /// Seat pool.
    pool: LicensePoolManager,
    /// Membership rows.
    members: Arc<dyn MembershipStore>,
    /// Pending invitations.
    invites: PendingInviteStore,
    /// Identity, billing and notification services.
    collaborators: Collaborators,
}

impl MembershipOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        pool: LicensePoolManager,
        members: Arc<dyn MembershipStore>,
        invites: PendingInviteStore,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            pool,
            members,
            invites,
            collaborators,
        }
    }

    /// The user's membership in the workspace.
    async fn require_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Membership, LicenseError> {
        self.members
            .find_member(workspace_id, user_id)
            .await?
            .ok_or(LicenseError::MemberNotFound {
                workspace_id,
                user_id,
            })
    }

    /// The caller's membership, which must be owner or manager.
    async fn require_manager(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> Result<Membership, LicenseError> {
        let actor = self
            .members
            .find_member(workspace_id, ctx.user_id)
            .await?
            .ok_or_else(|| LicenseError::Forbidden("not a member of this workspace".into()))?;
        if !actor.role.can_manage_members() {
            return Err(LicenseError::Forbidden(
                "only the owner or a manager can manage members".into(),
            ));
        }
        Ok(actor)
    }

    /// Fail fast if admitting `joining` more members would exceed the cap.
    async fn check_headcount(&self, workspace_id: Uuid, joining: i64) -> Result<(), LicenseError> {
        let caps = self.pool.seat_caps(workspace_id).await?;
        let current = self
            .members
            .count_members(workspace_id, MemberFilter::All)
            .await?;
        if caps.would_overflow(current, joining) {
            return Err(LicenseError::SeatCapacityExceeded {
                max_members: caps.max_members,
                current,
                joining,
            });
        }
        Ok(())
    }

    /// Grant every product as a saga step whose compensation revokes it.
    async fn grant_all<'a>(
        &'a self,
        saga: &mut Saga<'a>,
        workspace_id: Uuid,
        user_id: Uuid,
        products: &[Product],
    ) -> Result<(), LicenseError> {
        let mut ordered = products.to_vec();
        ordered.sort();
        ordered.dedup();
        for product in ordered {
            saga.step(
                format!("grant {product}"),
                self.pool.grant(workspace_id, product, user_id),
                move |_| self.pool.revoke(workspace_id, product, user_id),
            )
            .await?;
        }
        Ok(())
    }

    /// Email of a user for notifications; lookup failures are logged.
    async fn email_of(&self, user_id: Uuid) -> Option<String> {
        match self.collaborators.identity.find_by_id(user_id).await {
            Ok(account) => account.map(|a| a.email),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Identity lookup for notification failed");
                None
            }
        }
    }

    /// Send a notification; delivery failure never fails the workflow.
    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.collaborators.notifier.send(&notification).await {
            warn!(
                template = notification.template(),
                error = %e,
                "Notification dispatch failed"
            );
        }
    }
}

/// The step name carried in a partial-failure notification.
fn failed_step(err: &LicenseError) -> String {
    match err {
        LicenseError::PartialFailure { step, .. } => step.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared in-memory harness for orchestrator tests.

    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use seatkeeper_cache::CacheManager;
    use seatkeeper_cache::memory::MemoryCacheProvider;
    use seatkeeper_client::Collaborators;
    use seatkeeper_client::mock::{MockBillingService, MockIdentityService, MockNotifier};
    use seatkeeper_core::config::LicenseConfig;
    use seatkeeper_core::config::cache::MemoryCacheConfig;
    use seatkeeper_database::MemoryWorkspaceStore;
    use seatkeeper_database::store::MembershipStore;
    use seatkeeper_entity::account::Account;
    use seatkeeper_entity::license::{Product, PurchasedProduct};
    use seatkeeper_entity::workspace::{MemberType, Membership, WorkspaceRole};

    use super::MembershipOrchestrator;
    use crate::context::RequestContext;
    use crate::invite::PendingInviteStore;
    use crate::pool::{LicensePoolManager, PurchaseRequest};

    pub struct Harness {
        pub store: MemoryWorkspaceStore,
        pub pool: LicensePoolManager,
        pub orchestrator: MembershipOrchestrator,
        pub identity: MockIdentityService,
        pub billing: MockBillingService,
        pub notifier: MockNotifier,
        pub workspace_id: Uuid,
        pub owner: Account,
    }

    impl Harness {
        pub async fn new(products: &[(Product, u32)]) -> Self {
            let config = LicenseConfig::default();
            let store = MemoryWorkspaceStore::new();
            let pool = LicensePoolManager::new(Arc::new(store.clone()), config.allowances);
            let cache =
                CacheManager::in_memory(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
            let identity = MockIdentityService::new();
            let billing = MockBillingService::new();
            let notifier = MockNotifier::new();
            let collaborators = Collaborators {
                identity: Arc::new(identity.clone()),
                billing: Arc::new(billing.clone()),
                notifier: Arc::new(notifier.clone()),
            };
            let orchestrator = MembershipOrchestrator::new(
                pool.clone(),
                Arc::new(store.clone()),
                PendingInviteStore::new(cache, &config),
                collaborators,
            );

            let workspace_id = Uuid::new_v4();
            let owner = identity.add_account("owner@example.com", "Owner");
            store
                .create_member(&Membership::new(
                    workspace_id,
                    owner.id,
                    WorkspaceRole::Owner,
                    MemberType::Invited,
                ))
                .await
                .unwrap();
            pool.open_plan(&PurchaseRequest {
                user_id: owner.id,
                workspace_id,
                products: products
                    .iter()
                    .map(|(p, q)| PurchasedProduct::new(*p, *q))
                    .collect(),
                payment_ref: format!("pay-{workspace_id}"),
                billing_customer_id: Some("cus_owner".into()),
                ends_at: Utc::now() + Duration::days(365),
            })
            .await
            .unwrap();

            Self {
                store,
                pool,
                orchestrator,
                identity,
                billing,
                notifier,
                workspace_id,
                owner,
            }
        }

        pub fn owner_ctx(&self) -> RequestContext {
            RequestContext::new(self.owner.id)
        }

        pub async fn add_member(&self, email: &str, role: WorkspaceRole) -> Account {
            let account = self.identity.add_account(email, email);
            self.store
                .create_member(&Membership::new(
                    self.workspace_id,
                    account.id,
                    role,
                    MemberType::Invited,
                ))
                .await
                .unwrap();
            account
        }
    }
}
