//! Member listing joined with identity data and held products.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use seatkeeper_entity::license::Product;
use seatkeeper_entity::workspace::{MemberFilter, Membership};

use super::MembershipOrchestrator;
use crate::context::RequestContext;
use crate::error::LicenseError;

/// One member as shown to workspace members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberView {
    /// Membership row.
    #[serde(flatten)]
    pub membership: Membership,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Products the member holds a seat of.
    pub products: Vec<Product>,
}

impl MembershipOrchestrator {
    /// List the workspace's members matching `filter`, oldest first.
    ///
    /// Identity data is required: an identity outage or a missing account
    /// fails the listing rather than returning partial rows.
    pub async fn list_members(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
        filter: MemberFilter,
    ) -> Result<Vec<MemberView>, LicenseError> {
        self.require_member(workspace_id, ctx.user_id).await?;
        self.member_views(workspace_id, filter).await
    }

    /// Member listing without a caller check, for operator tooling.
    pub async fn member_views(
        &self,
        workspace_id: Uuid,
        filter: MemberFilter,
    ) -> Result<Vec<MemberView>, LicenseError> {
        let rows = self.members.list_members(workspace_id, filter).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|m| m.user_id).collect();
        let accounts: HashMap<Uuid, _> = self
            .collaborators
            .identity
            .list_accounts(&ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let mut views = Vec::with_capacity(rows.len());
        for membership in rows {
            let account = accounts.get(&membership.user_id).ok_or_else(|| {
                LicenseError::CollaboratorUnavailable {
                    service: "identity",
                    message: format!("no account returned for user {}", membership.user_id),
                }
            })?;
            let products = self
                .pool
                .held_products(workspace_id, membership.user_id)
                .await?;
            views.push(MemberView {
                email: account.email.clone(),
                name: account.name.clone(),
                products,
                membership,
            });
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatkeeper_entity::workspace::WorkspaceRole;

    use crate::error::FailureKind;
    use crate::membership::fixtures::Harness;

    #[tokio::test]
    async fn test_list_by_product() {
        let h = Harness::new(&[(Product::Drive, 3)]).await;
        let member = h.add_member("m@example.com", WorkspaceRole::Member).await;
        h.pool
            .grant(h.workspace_id, Product::Drive, member.id)
            .await
            .unwrap();

        let all = h
            .orchestrator
            .list_members(&h.owner_ctx(), h.workspace_id, MemberFilter::All)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let drive = h
            .orchestrator
            .list_members(
                &h.owner_ctx(),
                h.workspace_id,
                MemberFilter::Product(Product::Drive),
            )
            .await
            .unwrap();
        assert_eq!(drive.len(), 1);
        assert_eq!(drive[0].email, "m@example.com");
        assert_eq!(drive[0].products, vec![Product::Drive]);
    }

    #[tokio::test]
    async fn test_identity_outage_is_a_hard_failure() {
        let h = Harness::new(&[(Product::Drive, 3)]).await;
        h.identity.set_unavailable(true);
        let err = h
            .orchestrator
            .list_members(&h.owner_ctx(), h.workspace_id, MemberFilter::All)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Unavailable);
    }
}
