//! Aggregate resource totals and usage reports.

use std::ops::Add;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use seatkeeper_core::config::{ProductAllowances, ResourceCeilings};

use super::product::{Product, PurchasedProduct};
use super::status::ProductStatus;

/// Aggregate call time, storage and download hits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTotals {
    /// Call time in minutes.
    pub call_time_minutes: i64,
    /// Storage in gigabytes.
    pub storage_gb: i64,
    /// Download hits.
    pub download_hits: i64,
}

impl ResourceTotals {
    /// Sum the allowances of every purchased seat.
    pub fn for_products(allowances: &ProductAllowances, products: &[PurchasedProduct]) -> Self {
        products.iter().fold(Self::default(), |acc, line| {
            acc + Self::for_seats(allowances, line.product, i64::from(line.quantity))
        })
    }

    /// Allowance of `seats` seats of one product.
    pub fn for_seats(allowances: &ProductAllowances, product: Product, seats: i64) -> Self {
        let per_seat = product.allowance(allowances);
        Self {
            call_time_minutes: per_seat.call_time_minutes * seats,
            storage_gb: per_seat.storage_gb * seats,
            download_hits: per_seat.download_hits * seats,
        }
    }

    /// Component-wise subtraction clamped at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self {
            call_time_minutes: (self.call_time_minutes - rhs.call_time_minutes).max(0),
            storage_gb: (self.storage_gb - rhs.storage_gb).max(0),
            download_hits: (self.download_hits - rhs.download_hits).max(0),
        }
    }

    /// The first ceiling these totals exceed, if any.
    pub fn exceeded_ceiling(&self, ceilings: &ResourceCeilings) -> Option<&'static str> {
        if self.call_time_minutes > ceilings.max_call_time_minutes {
            Some("call_time")
        } else if self.storage_gb > ceilings.max_storage_gb {
            Some("storage")
        } else if self.download_hits > ceilings.max_download_hits {
            Some("download_hits")
        } else {
            None
        }
    }
}

impl Add for ResourceTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            call_time_minutes: self.call_time_minutes + rhs.call_time_minutes,
            storage_gb: self.storage_gb + rhs.storage_gb,
            download_hits: self.download_hits + rhs.download_hits,
        }
    }
}

/// Seat usage of one product pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUsage {
    /// Product.
    pub product: Product,
    /// Purchased seats.
    pub quantity: i64,
    /// Seats currently held.
    pub in_use: i64,
    /// Pool status.
    pub status: ProductStatus,
}

impl ProductUsage {
    /// Seats still grantable.
    pub fn available(&self) -> i64 {
        (self.quantity - self.in_use).max(0)
    }
}

/// Read-only usage report for one plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanUsage {
    /// Plan identifier.
    pub plan_id: Uuid,
    /// Workspace identifier.
    pub workspace_id: Uuid,
    /// Per-product usage in product order.
    pub products: Vec<ProductUsage>,
    /// Seats in use across all products.
    pub seats_in_use: i64,
    /// Resources granted to the seats in use.
    pub allocated: ResourceTotals,
    /// The plan's aggregate resource caps.
    pub caps: ResourceTotals,
}

/// Headcount caps of a workspace, derived from its active plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatCaps {
    /// Active plan.
    pub plan_id: Uuid,
    /// Maximum number of members.
    pub max_members: i64,
    /// Per-product usage.
    pub products: Vec<ProductUsage>,
}

impl SeatCaps {
    /// Whether `current + joining` members would exceed the cap.
    pub fn would_overflow(&self, current: i64, joining: i64) -> bool {
        current + joining > self.max_members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_sum_allowances() {
        let allowances = ProductAllowances::default();
        let totals = ResourceTotals::for_products(
            &allowances,
            &[
                PurchasedProduct::new(Product::Remote, 2),
                PurchasedProduct::new(Product::Drive, 1),
            ],
        );
        assert_eq!(
            totals.call_time_minutes,
            allowances.remote.call_time_minutes * 2
        );
        assert_eq!(totals.storage_gb, allowances.drive.storage_gb);
        assert_eq!(totals.download_hits, allowances.drive.download_hits);
    }

    #[test]
    fn test_exceeded_ceiling() {
        let ceilings = ResourceCeilings {
            max_call_time_minutes: 100,
            max_storage_gb: 10,
            max_download_hits: 5,
        };
        let totals = ResourceTotals {
            call_time_minutes: 50,
            storage_gb: 11,
            download_hits: 0,
        };
        assert_eq!(totals.exceeded_ceiling(&ceilings), Some("storage"));
        assert_eq!(ResourceTotals::default().exceeded_ceiling(&ceilings), None);
    }

    #[test]
    fn test_would_overflow() {
        let caps = SeatCaps {
            plan_id: Uuid::nil(),
            max_members: 3,
            products: Vec::new(),
        };
        assert!(!caps.would_overflow(2, 1));
        assert!(caps.would_overflow(2, 2));
    }
}
