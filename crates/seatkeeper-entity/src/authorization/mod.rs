//! Allocation authorization TTL records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::license::ResourceTotals;

/// Binds a billing "can-I-allocate" check to the allocation that follows it.
///
/// The allocation call must recompute the same totals from its own product
/// list before the pool is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationAuthorization {
    /// Opaque single-use code.
    pub code: String,
    /// User who requested the check.
    pub user_id: Uuid,
    /// Workspace the purchase is for.
    pub workspace_id: Uuid,
    /// Totals (existing plan + requested products) computed at check time.
    pub expected: ResourceTotals,
    /// When the check was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token stops being readable.
    pub expires_at: DateTime<Utc>,
}

impl AllocationAuthorization {
    /// Whether a recomputed request matches this authorization exactly.
    pub fn matches(&self, user_id: Uuid, workspace_id: Uuid, totals: &ResourceTotals) -> bool {
        self.user_id == user_id && self.workspace_id == workspace_id && self.expected == *totals
    }
}
