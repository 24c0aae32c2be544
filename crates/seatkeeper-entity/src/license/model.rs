//! License plan, product pool and seat row entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::product::{Product, PurchasedProduct};
use super::status::{PlanStatus, ProductStatus, SeatStatus};
use super::usage::ResourceTotals;

/// The license entitlement of one workspace.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LicensePlan {
    /// Plan identifier.
    pub id: Uuid,
    /// User who purchased the plan.
    pub owner_id: Uuid,
    /// Workspace the plan belongs to.
    pub workspace_id: Uuid,
    /// Start of the validity window.
    pub starts_at: DateTime<Utc>,
    /// End of the validity window.
    pub ends_at: DateTime<Utc>,
    /// Maximum number of workspace members.
    pub max_members: i32,
    /// Aggregate call time cap in minutes.
    pub max_call_time_minutes: i64,
    /// Aggregate storage cap in gigabytes.
    pub max_storage_gb: i64,
    /// Aggregate download-hit cap.
    pub max_download_hits: i64,
    /// Payment reference of the purchase that opened the plan.
    pub payment_ref: String,
    /// Billing-service customer used for recurring charges.
    pub billing_customer_id: Option<String>,
    /// Plan status.
    pub status: PlanStatus,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// When the plan was last updated.
    pub updated_at: DateTime<Utc>,
}

impl LicensePlan {
    /// Whether this plan is the workspace's active plan.
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    /// The plan's aggregate resource caps.
    pub fn caps(&self) -> ResourceTotals {
        ResourceTotals {
            call_time_minutes: self.max_call_time_minutes,
            storage_gb: self.max_storage_gb,
            download_hits: self.max_download_hits,
        }
    }
}

/// Data required to open a plan on first allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLicensePlan {
    /// Purchasing user.
    pub owner_id: Uuid,
    /// Workspace receiving the plan.
    pub workspace_id: Uuid,
    /// End of the validity window.
    pub ends_at: DateTime<Utc>,
    /// Aggregate resource caps.
    pub caps: ResourceTotals,
    /// Payment reference of the opening purchase.
    pub payment_ref: String,
    /// Billing-service customer.
    pub billing_customer_id: Option<String>,
    /// Products and seat counts purchased.
    pub products: Vec<PurchasedProduct>,
}

/// A purchase applied to an existing plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTopUp {
    /// Plan receiving the seats.
    pub plan_id: Uuid,
    /// Workspace owning the plan.
    pub workspace_id: Uuid,
    /// Payment reference of the purchase.
    pub payment_ref: String,
    /// Resources the purchased seats add to the plan caps.
    pub added_caps: ResourceTotals,
    /// Products and seat counts added.
    pub products: Vec<PurchasedProduct>,
    /// Requested end of the validity window; never shortens the plan.
    pub ends_at: DateTime<Utc>,
}

/// The seat pool for one product within a plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LicenseProduct {
    /// Product pool identifier.
    pub id: Uuid,
    /// Owning plan.
    pub plan_id: Uuid,
    /// Workspace (denormalised from the plan).
    pub workspace_id: Uuid,
    /// Which product this pool sells.
    pub product: Product,
    /// Total purchased seats.
    pub quantity: i32,
    /// Pool status.
    pub status: ProductStatus,
    /// When the pool was created.
    pub created_at: DateTime<Utc>,
    /// When the pool was last updated.
    pub updated_at: DateTime<Utc>,
}

/// One physical seat row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Seat {
    /// Serial seat identifier; creation order.
    pub id: i64,
    /// Owning product pool.
    pub product_id: Uuid,
    /// Seat status.
    pub status: SeatStatus,
    /// Holder; set iff `status == Use`.
    pub user_id: Option<Uuid>,
    /// When the seat row was created.
    pub created_at: DateTime<Utc>,
    /// When the seat row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Seat {
    /// Whether the seat satisfies the holder invariant.
    pub fn is_consistent(&self) -> bool {
        (self.status == SeatStatus::Use) == self.user_id.is_some()
    }
}
