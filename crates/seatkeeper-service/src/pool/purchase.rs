//! Purchase requests applied to a workspace's plan.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use seatkeeper_core::config::ProductAllowances;
use seatkeeper_entity::license::{Product, PurchasedProduct, ResourceTotals};

/// A paid purchase of seats for one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Purchasing user.
    pub user_id: Uuid,
    /// Workspace receiving the seats.
    pub workspace_id: Uuid,
    /// Purchased products and seat counts.
    pub products: Vec<PurchasedProduct>,
    /// Payment reference; unique per purchase.
    pub payment_ref: String,
    /// Billing-service customer for recurring charges.
    pub billing_customer_id: Option<String>,
    /// End of the validity window bought.
    pub ends_at: DateTime<Utc>,
}

impl PurchaseRequest {
    /// Purchase lines merged per product, zero quantities dropped, in
    /// product order.
    pub fn lines(&self) -> Vec<PurchasedProduct> {
        merge_lines(&self.products)
    }

    /// Resources the purchased seats contribute.
    pub fn totals(&self, allowances: &ProductAllowances) -> ResourceTotals {
        ResourceTotals::for_products(allowances, &self.lines())
    }
}

/// Merge duplicate products and drop empty lines.
pub(crate) fn merge_lines(lines: &[PurchasedProduct]) -> Vec<PurchasedProduct> {
    let mut merged: BTreeMap<Product, u32> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.quantity > 0) {
        let entry = merged.entry(line.product).or_default();
        *entry = entry.saturating_add(line.quantity);
    }
    merged
        .into_iter()
        .map(|(product, quantity)| PurchasedProduct::new(product, quantity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_merged_and_ordered() {
        let lines = merge_lines(&[
            PurchasedProduct::new(Product::Drive, 1),
            PurchasedProduct::new(Product::Remote, 2),
            PurchasedProduct::new(Product::Drive, 3),
            PurchasedProduct::new(Product::Meeting, 0),
        ]);
        assert_eq!(
            lines,
            vec![
                PurchasedProduct::new(Product::Remote, 2),
                PurchasedProduct::new(Product::Drive, 4),
            ]
        );
    }
}
