//! Workspace and account secession.
//!
//! Irreversible: billing is cancelled, the plan is terminated, pending
//! invitations are purged and memberships deleted. A failure midway is
//! not retried; it is logged for manual reconciliation and surfaced.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::MembershipOrchestrator;
use crate::context::RequestContext;
use crate::error::LicenseError;

/// What a workspace secession did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecessionReport {
    /// Workspace torn down.
    pub workspace_id: Uuid,
    /// Terminated plan, if the workspace had one.
    pub plan_id: Option<Uuid>,
    /// Whether the recurring subscription was cancelled.
    pub billing_cancelled: bool,
    /// Pending invitations purged.
    pub invites_purged: u64,
    /// Memberships deleted.
    pub members_removed: u64,
}

impl MembershipOrchestrator {
    /// Tear down a workspace. Owner only.
    pub async fn secede_workspace(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> Result<SecessionReport, LicenseError> {
        let actor = self.require_member(workspace_id, ctx.user_id).await?;
        if !actor.role.is_owner() {
            return Err(LicenseError::Forbidden(
                "only the owner can delete a workspace".into(),
            ));
        }
        self.secede(workspace_id).await
    }

    /// Tear down every workspace the caller owns, then delete the caller's
    /// identity.
    pub async fn secede_account(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<SecessionReport>, LicenseError> {
        let owned = self.members.owned_workspaces(ctx.user_id).await?;
        let mut reports = Vec::with_capacity(owned.len());
        for workspace_id in owned {
            reports.push(self.secede(workspace_id).await?);
        }

        if let Err(e) = self.collaborators.identity.delete_account(ctx.user_id).await {
            error!(
                user_id = %ctx.user_id,
                error = %e,
                "Workspaces terminated but identity deletion failed; manual reconciliation required"
            );
            return Err(e.into());
        }
        info!(
            user_id = %ctx.user_id,
            workspaces = reports.len(),
            "Account seceded"
        );
        Ok(reports)
    }

    async fn secede(&self, workspace_id: Uuid) -> Result<SecessionReport, LicenseError> {
        let plan = self.pool.current_plan(workspace_id).await?;

        let mut billing_cancelled = false;
        if let Some(customer_id) = plan.as_ref().and_then(|p| p.billing_customer_id.as_deref()) {
            match self.collaborators.billing.cancel_subscription(customer_id).await {
                Ok(()) => billing_cancelled = true,
                Err(e) => warn!(
                    workspace_id = %workspace_id,
                    error = %e,
                    "Subscription cancellation failed; continuing secession"
                ),
            }
        }

        match self.teardown(workspace_id, plan.is_some()).await {
            Ok((invites_purged, members_removed)) => {
                info!(
                    workspace_id = %workspace_id,
                    billing_cancelled,
                    invites_purged,
                    members_removed,
                    "Workspace seceded"
                );
                Ok(SecessionReport {
                    workspace_id,
                    plan_id: plan.map(|p| p.id),
                    billing_cancelled,
                    invites_purged,
                    members_removed,
                })
            }
            Err(e) => {
                error!(
                    workspace_id = %workspace_id,
                    error = %e,
                    "Workspace secession failed; manual reconciliation required"
                );
                Err(e)
            }
        }
    }

    async fn teardown(&self, workspace_id: Uuid, has_plan: bool) -> Result<(u64, u64), LicenseError> {
        if has_plan {
            self.pool.terminate_plan(workspace_id).await?;
        }
        let invites_purged = self.invites.purge_workspace(workspace_id).await?;
        let members_removed = self.members.delete_workspace_members(workspace_id).await?;
        Ok((invites_purged, members_removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatkeeper_database::store::LicenseStore;
    use seatkeeper_entity::license::{PlanStatus, Product, ProductSelection};
    use seatkeeper_entity::workspace::WorkspaceRole;

    use crate::membership::InviteRequest;
    use crate::membership::fixtures::Harness;

    #[tokio::test]
    async fn test_secede_workspace_tears_everything_down() {
        let h = Harness::new(&[(Product::Remote, 3)]).await;
        let member = h.add_member("m@example.com", WorkspaceRole::Member).await;
        h.pool
            .grant(h.workspace_id, Product::Remote, member.id)
            .await
            .unwrap();
        h.identity.add_account("pending@example.com", "Pending");
        h.orchestrator
            .invite(
                &h.owner_ctx(),
                h.workspace_id,
                vec![InviteRequest {
                    email: "pending@example.com".into(),
                    role: WorkspaceRole::Member,
                    products: ProductSelection::from_products(&[Product::Remote]),
                }],
            )
            .await
            .unwrap();
        let plan = h.pool.active_plan(h.workspace_id).await.unwrap();

        let report = h
            .orchestrator
            .secede_workspace(&h.owner_ctx(), h.workspace_id)
            .await
            .unwrap();

        assert_eq!(report.plan_id, Some(plan.id));
        assert!(report.billing_cancelled);
        assert_eq!(report.invites_purged, 1);
        assert_eq!(report.members_removed, 2);
        assert_eq!(h.billing.cancelled(), vec!["cus_owner".to_string()]);
        assert!(h.pool.current_plan(h.workspace_id).await.unwrap().is_none());
        let stored = h.store.find_plan(plan.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PlanStatus::Terminate);
        assert!(h.pool.held_products(h.workspace_id, member.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_billing_outage_does_not_block_secession() {
        let h = Harness::new(&[(Product::Remote, 1)]).await;
        h.billing.set_unavailable(true);
        let report = h
            .orchestrator
            .secede_workspace(&h.owner_ctx(), h.workspace_id)
            .await
            .unwrap();
        assert!(!report.billing_cancelled);
        assert!(report.plan_id.is_some());
    }

    #[tokio::test]
    async fn test_secede_account_deletes_identity_last() {
        let h = Harness::new(&[(Product::Remote, 2)]).await;
        let reports = h.orchestrator.secede_account(&h.owner_ctx()).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(h.identity.deleted(), vec![h.owner.id]);
    }

    #[tokio::test]
    async fn test_only_owner_may_secede() {
        let h = Harness::new(&[(Product::Remote, 2)]).await;
        let manager = h.add_member("mgr@example.com", WorkspaceRole::Manager).await;
        assert!(matches!(
            h.orchestrator
                .secede_workspace(&RequestContext::new(manager.id), h.workspace_id)
                .await,
            Err(LicenseError::Forbidden(_))
        ));
    }
}
