//! Kick-out and voluntary exit.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use seatkeeper_client::Notification;
use seatkeeper_entity::license::Product;

use super::MembershipOrchestrator;
use crate::context::RequestContext;
use crate::error::LicenseError;

/// Result of removing a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartureReport {
    /// Workspace left.
    pub workspace_id: Uuid,
    /// Departed user.
    pub user_id: Uuid,
    /// Products whose seat was released.
    pub revoked: Vec<Product>,
    /// Products whose seat could not be released and remains orphaned.
    pub orphaned: Vec<Product>,
}

impl MembershipOrchestrator {
    /// Remove another member. Owners may remove managers and members;
    /// managers may remove members.
    pub async fn kick_out(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
        target_id: Uuid,
    ) -> Result<DepartureReport, LicenseError> {
        let actor = self.require_manager(ctx, workspace_id).await?;
        if target_id == ctx.user_id {
            return Err(LicenseError::Forbidden(
                "use leave to exit a workspace".into(),
            ));
        }
        let target = self.require_member(workspace_id, target_id).await?;
        if target.role.privilege_level() >= actor.role.privilege_level() {
            return Err(LicenseError::Forbidden(format!(
                "a {} cannot remove a {}",
                actor.role, target.role
            )));
        }

        let report = self.depart(workspace_id, target_id).await?;
        if let Some(to) = self.email_of(target_id).await {
            self.notify(Notification::RemovedFromWorkspace { to, workspace_id })
                .await;
        }
        Ok(report)
    }

    /// Leave a workspace. The owner cannot leave; it secedes instead.
    pub async fn leave(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> Result<DepartureReport, LicenseError> {
        let member = self.require_member(workspace_id, ctx.user_id).await?;
        if member.role.is_owner() {
            return Err(LicenseError::Forbidden(
                "the owner cannot leave; secede the workspace instead".into(),
            ));
        }
        self.depart(workspace_id, ctx.user_id).await
    }

    /// Revoke every held seat best-effort, then delete the membership.
    async fn depart(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<DepartureReport, LicenseError> {
        let held = self.pool.held_products(workspace_id, user_id).await?;
        let mut revoked = Vec::with_capacity(held.len());
        let mut orphaned = Vec::new();
        for product in held {
            match self.pool.revoke(workspace_id, product, user_id).await {
                Ok(()) => revoked.push(product),
                Err(e) => {
                    warn!(
                        workspace_id = %workspace_id,
                        user_id = %user_id,
                        product = %product,
                        error = %e,
                        "Seat revoke failed during departure; seat left orphaned"
                    );
                    orphaned.push(product);
                }
            }
        }

        if !self.members.delete_member(workspace_id, user_id).await? {
            return Err(LicenseError::MemberNotFound {
                workspace_id,
                user_id,
            });
        }
        info!(
            workspace_id = %workspace_id,
            user_id = %user_id,
            revoked = revoked.len(),
            orphaned = orphaned.len(),
            "Member removed"
        );

        Ok(DepartureReport {
            workspace_id,
            user_id,
            revoked,
            orphaned,
        })
    }
}
