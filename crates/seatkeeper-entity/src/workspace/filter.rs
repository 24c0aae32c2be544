//! Typed member filters used for headcount and listing queries.

use serde::{Deserialize, Serialize};

use super::member::{MemberType, Membership};
use super::role::WorkspaceRole;
use crate::license::Product;

/// Which members of a workspace a query selects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum MemberFilter {
    /// Every member.
    #[default]
    All,
    /// Members holding the given role.
    Role(WorkspaceRole),
    /// Members holding a seat of the given product.
    Product(Product),
    /// Members that joined the given way.
    MemberType(MemberType),
}

impl MemberFilter {
    /// Evaluate the filter against a membership row.
    ///
    /// `holds` answers whether the member holds a seat of a product; it is
    /// only consulted for [`MemberFilter::Product`].
    pub fn matches(&self, member: &Membership, holds: impl Fn(Product) -> bool) -> bool {
        match self {
            Self::All => true,
            Self::Role(role) => member.role == *role,
            Self::Product(product) => holds(*product),
            Self::MemberType(kind) => member.member_type == *kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_matches() {
        let member = Membership::new(
            Uuid::nil(),
            Uuid::nil(),
            WorkspaceRole::Manager,
            MemberType::Provisioned,
        );
        assert!(MemberFilter::All.matches(&member, |_| false));
        assert!(MemberFilter::Role(WorkspaceRole::Manager).matches(&member, |_| false));
        assert!(!MemberFilter::Role(WorkspaceRole::Owner).matches(&member, |_| false));
        assert!(MemberFilter::Product(Product::Drive).matches(&member, |p| p == Product::Drive));
        assert!(!MemberFilter::MemberType(MemberType::Invited).matches(&member, |_| true));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&MemberFilter::Product(Product::Remote)).unwrap();
        assert_eq!(json, r#"{"by":"product","value":"REMOTE"}"#);
    }
}
