//! Lifecycle status enums for plans, products and seats.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a workspace license plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "license_plan_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanStatus {
    /// The plan is in force. At most one per workspace.
    Active,
    /// The plan is suspended.
    Inactive,
    /// The plan was terminated by secession. Irreversible.
    Terminate,
}

impl PlanStatus {
    /// Return the status as its stored string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Terminate => "TERMINATE",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one product's seat pool.
///
/// `Active ⇄ Exceeded → Inactive`. `Exceeded` is entered only by a
/// quantity reduction that leaves more seats in use than allowed and is
/// left automatically once usage falls back within quantity. `Inactive`
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "license_product_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductStatus {
    /// Seats may be granted and revoked.
    Active,
    /// More seats are in use than purchased; revokes retire seats.
    Exceeded,
    /// The plan was terminated; no grants or revokes.
    Inactive,
}

impl ProductStatus {
    /// Return the status as its stored string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Exceeded => "EXCEEDED",
            Self::Inactive => "INACTIVE",
        }
    }

    /// The status a non-terminal product should have for the given usage.
    pub fn for_usage(in_use: i64, quantity: i64) -> Self {
        if in_use > quantity {
            Self::Exceeded
        } else {
            Self::Active
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Inactive)
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one physical seat row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "license_seat_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatStatus {
    /// Free for allocation.
    Unuse,
    /// Held by exactly one user.
    Use,
    /// Permanently retired.
    Terminate,
}

impl SeatStatus {
    /// Return the status as its stored string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unuse => "UNUSE",
            Self::Use => "USE",
            Self::Terminate => "TERMINATE",
        }
    }

    /// Whether the seat still counts towards the product's live rows.
    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Terminate)
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_usage() {
        assert_eq!(ProductStatus::for_usage(2, 1), ProductStatus::Exceeded);
        assert_eq!(ProductStatus::for_usage(1, 1), ProductStatus::Active);
        assert_eq!(ProductStatus::for_usage(0, 3), ProductStatus::Active);
    }

    #[test]
    fn test_serde_uses_stored_names() {
        let json = serde_json::to_string(&SeatStatus::Unuse).unwrap();
        assert_eq!(json, "\"UNUSE\"");
        let parsed: PlanStatus = serde_json::from_str("\"TERMINATE\"").unwrap();
        assert_eq!(parsed, PlanStatus::Terminate);
    }
}
