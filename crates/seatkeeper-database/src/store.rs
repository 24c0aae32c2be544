//! Storage traits for the seat pool and workspace memberships.
//!
//! Two implementations are provided:
//! - PostgreSQL repositories (see [`crate::repositories`])
//! - In-memory store (see [`crate::memory`]) for single-process use and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use seatkeeper_core::result::AppResult;
use seatkeeper_entity::license::{
    LicensePlan, LicenseProduct, NewLicensePlan, PlanStatus, PlanTopUp, Product, ProductStatus,
    ResourceTotals, Seat, SeatStatus,
};
use seatkeeper_entity::workspace::{MemberFilter, Membership, WorkspaceRole};

/// Durable per-plan counters and per-seat rows.
///
/// Only the license pool manager calls this trait; it is the single owner
/// of the status transitions. Seat state changes go through
/// [`LicenseStore::transition_seat`], a compare-and-set on seat status.
#[async_trait]
pub trait LicenseStore: Send + Sync + std::fmt::Debug + 'static {
    /// The workspace's plan with status ACTIVE, if any.
    async fn find_active_plan(&self, workspace_id: Uuid) -> AppResult<Option<LicensePlan>>;

    /// A plan by identifier, whatever its status.
    async fn find_plan(&self, plan_id: Uuid) -> AppResult<Option<LicensePlan>>;

    /// Atomically create a plan, its product pools, one UNUSE seat row per
    /// purchased unit, and the purchase record for `payment_ref`.
    async fn create_plan(&self, plan: &NewLicensePlan, max_members: i32) -> AppResult<LicensePlan>;

    /// Atomically apply a purchase to an existing ACTIVE plan.
    ///
    /// In one transaction: record `payment_ref`, add each line to its
    /// product pool (creating the pool if the plan does not sell it yet),
    /// bring free seat rows up to `quantity - in_use`, return EXCEEDED pools
    /// that now fit to ACTIVE, add `added_caps` to the plan caps, recompute
    /// the member cap and extend `ends_at`.
    ///
    /// Returns `None` and changes nothing when the payment reference was
    /// already recorded.
    async fn apply_purchase(&self, top_up: &PlanTopUp) -> AppResult<Option<LicensePlan>>;

    /// Overwrite the plan's aggregate caps, member cap and validity end.
    async fn update_plan_caps(
        &self,
        plan_id: Uuid,
        caps: &ResourceTotals,
        max_members: i32,
        ends_at: DateTime<Utc>,
    ) -> AppResult<LicensePlan>;

    /// Set the plan status.
    async fn set_plan_status(&self, plan_id: Uuid, status: PlanStatus) -> AppResult<()>;

    /// All product pools of a plan in product order.
    async fn list_products(&self, plan_id: Uuid) -> AppResult<Vec<LicenseProduct>>;

    /// One product pool of a plan.
    async fn find_product(&self, plan_id: Uuid, product: Product)
    -> AppResult<Option<LicenseProduct>>;

    /// Set a pool's purchased quantity.
    async fn set_product_quantity(&self, product_id: Uuid, quantity: i32) -> AppResult<()>;

    /// Set a pool's status.
    async fn set_product_status(&self, product_id: Uuid, status: ProductStatus) -> AppResult<()>;

    /// Count a pool's seat rows in the given status.
    async fn count_seats(&self, product_id: Uuid, status: SeatStatus) -> AppResult<i64>;

    /// Append `count` UNUSE seat rows.
    async fn create_seats(&self, product_id: Uuid, count: i64) -> AppResult<u64>;

    /// Retire up to `count` UNUSE rows (newest first) to TERMINATE.
    async fn retire_unused_seats(&self, product_id: Uuid, count: i64) -> AppResult<u64>;

    /// The oldest UNUSE seat row of a pool.
    async fn first_unused_seat(&self, product_id: Uuid) -> AppResult<Option<Seat>>;

    /// The USE seat a user holds in a pool.
    async fn find_held_seat(&self, product_id: Uuid, user_id: Uuid) -> AppResult<Option<Seat>>;

    /// Move a seat from `from` to `to` only if it is currently `from`.
    ///
    /// `holder` becomes the seat's user (pass `None` to clear it). Returns
    /// `false` when a concurrent writer changed the seat first. A second USE
    /// seat for the same user in the same pool fails with a conflict error.
    async fn transition_seat(
        &self,
        seat_id: i64,
        from: SeatStatus,
        to: SeatStatus,
        holder: Option<Uuid>,
    ) -> AppResult<bool>;

    /// Clear every USE seat of a plan back to UNUSE with no holder.
    async fn release_plan_seats(&self, plan_id: Uuid) -> AppResult<u64>;

    /// Products of the workspace's active plan the user holds a seat of.
    async fn held_products(&self, workspace_id: Uuid, user_id: Uuid) -> AppResult<Vec<Product>>;
}

/// Workspace membership and role-assignment rows.
#[async_trait]
pub trait MembershipStore: Send + Sync + std::fmt::Debug + 'static {
    /// One membership.
    async fn find_member(&self, workspace_id: Uuid, user_id: Uuid)
    -> AppResult<Option<Membership>>;

    /// Members matching a filter, oldest first.
    async fn list_members(
        &self,
        workspace_id: Uuid,
        filter: MemberFilter,
    ) -> AppResult<Vec<Membership>>;

    /// Number of members matching a filter.
    async fn count_members(&self, workspace_id: Uuid, filter: MemberFilter) -> AppResult<i64>;

    /// Insert a membership. Fails with a conflict error if one exists.
    async fn create_member(&self, member: &Membership) -> AppResult<Membership>;

    /// Change a member's role. Returns `false` if the member does not exist.
    async fn update_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> AppResult<bool>;

    /// Delete a membership and its role assignment.
    async fn delete_member(&self, workspace_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Delete every membership of a workspace.
    async fn delete_workspace_members(&self, workspace_id: Uuid) -> AppResult<u64>;

    /// Workspaces in which the user holds the owner role.
    async fn owned_workspaces(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;
}
