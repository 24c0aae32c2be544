//! Bulk creation of member accounts.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use seatkeeper_entity::account::{Account, NewAccount};
use seatkeeper_entity::license::{Product, ProductSelection};
use seatkeeper_entity::workspace::{MemberType, Membership, WorkspaceRole};

use super::MembershipOrchestrator;
use crate::context::RequestContext;
use crate::error::LicenseError;
use crate::saga::Saga;

/// One account to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Workspace role.
    pub role: WorkspaceRole,
    /// Products to grant.
    #[serde(flatten)]
    pub products: ProductSelection,
}

/// An account created by provisioning, with its seats and membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedAccount {
    /// Created identity.
    pub account: Account,
    /// Created membership.
    pub membership: Membership,
    /// Granted products.
    pub products: Vec<Product>,
}

impl MembershipOrchestrator {
    /// Create accounts, grant their seats and add them to the workspace.
    ///
    /// Accounts are provisioned one at a time. If one fails, its seats are
    /// revoked and its identity deleted; accounts provisioned before it in
    /// the batch are kept.
    pub async fn provision_accounts(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
        requests: Vec<ProvisionRequest>,
    ) -> Result<Vec<ProvisionedAccount>, LicenseError> {
        self.require_manager(ctx, workspace_id).await?;
        for request in &requests {
            if request.products.is_empty() {
                return Err(LicenseError::NoLicenseSelected);
            }
            if request.role.is_owner() {
                return Err(LicenseError::InvalidRole(
                    "provisioned accounts cannot be owners".into(),
                ));
            }
        }
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        self.check_headcount(workspace_id, requests.len() as i64)
            .await?;

        let mut provisioned = Vec::with_capacity(requests.len());
        for request in requests {
            provisioned.push(self.provision_one(workspace_id, request).await?);
        }
        info!(
            workspace_id = %workspace_id,
            count = provisioned.len(),
            "Accounts provisioned"
        );
        Ok(provisioned)
    }

    async fn provision_one(
        &self,
        workspace_id: Uuid,
        request: ProvisionRequest,
    ) -> Result<ProvisionedAccount, LicenseError> {
        let mut saga = Saga::new("provision_account");
        let identity = &self.collaborators.identity;

        let account = saga
            .step(
                "create identity",
                async {
                    identity
                        .create_account(&NewAccount {
                            email: request.email.clone(),
                            name: request.name.clone(),
                            workspace_id,
                        })
                        .await
                        .map_err(LicenseError::from)
                },
                |account: &Account| {
                    let user_id = account.id;
                    async move {
                        identity
                            .delete_account(user_id)
                            .await
                            .map_err(LicenseError::from)
                    }
                },
            )
            .await?;

        let products = request.products.products();
        self.grant_all(&mut saga, workspace_id, account.id, &products)
            .await?;

        let membership = Membership::new(
            workspace_id,
            account.id,
            request.role,
            MemberType::Provisioned,
        );
        let membership = saga
            .run("create membership", async {
                Ok(self.members.create_member(&membership).await?)
            })
            .await?;
        saga.finish();

        info!(
            workspace_id = %workspace_id,
            user_id = %account.id,
            products = ?products,
            "Account provisioned"
        );
        Ok(ProvisionedAccount {
            account,
            membership,
            products,
        })
    }
}
