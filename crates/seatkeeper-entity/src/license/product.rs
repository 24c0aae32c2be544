//! Licensed products and product selections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use seatkeeper_core::config::{ProductAllowance, ProductAllowances};

/// A licensed product sold per seat.
///
/// The declaration order is the fixed order in which a user's grants and
/// revokes are performed, so compensation always unwinds a strict prefix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "license_product_kind", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Product {
    /// Remote support sessions.
    Remote,
    /// Video meetings.
    Meeting,
    /// Shared drive storage.
    Drive,
}

impl Product {
    /// Every product, in grant order.
    pub const ALL: [Product; 3] = [Product::Remote, Product::Meeting, Product::Drive];

    /// Return the product as its stored string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "REMOTE",
            Self::Meeting => "MEETING",
            Self::Drive => "DRIVE",
        }
    }

    /// Resources one seat of this product contributes.
    pub fn allowance(&self, table: &ProductAllowances) -> ProductAllowance {
        match self {
            Self::Remote => table.remote,
            Self::Meeting => table.meeting,
            Self::Drive => table.drive,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = seatkeeper_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "REMOTE" => Ok(Self::Remote),
            "MEETING" => Ok(Self::Meeting),
            "DRIVE" => Ok(Self::Drive),
            _ => Err(seatkeeper_core::AppError::validation(format!(
                "Invalid product: '{s}'. Expected one of: REMOTE, MEETING, DRIVE"
            ))),
        }
    }
}

/// The per-product grant flags carried by invitations and revisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSelection {
    /// Grant a REMOTE seat.
    #[serde(default)]
    pub remote: bool,
    /// Grant a MEETING seat.
    #[serde(default)]
    pub meeting: bool,
    /// Grant a DRIVE seat.
    #[serde(default)]
    pub drive: bool,
}

impl ProductSelection {
    /// Build a selection from a product list.
    pub fn from_products<'a>(products: impl IntoIterator<Item = &'a Product>) -> Self {
        let mut selection = Self::default();
        for product in products {
            match product {
                Product::Remote => selection.remote = true,
                Product::Meeting => selection.meeting = true,
                Product::Drive => selection.drive = true,
            }
        }
        selection
    }

    /// Whether the given product is selected.
    pub fn contains(&self, product: Product) -> bool {
        match product {
            Product::Remote => self.remote,
            Product::Meeting => self.meeting,
            Product::Drive => self.drive,
        }
    }

    /// Selected products in grant order.
    pub fn products(&self) -> Vec<Product> {
        Product::ALL
            .into_iter()
            .filter(|p| self.contains(*p))
            .collect()
    }

    /// Whether no product is selected.
    pub fn is_empty(&self) -> bool {
        !(self.remote || self.meeting || self.drive)
    }
}

/// One line of a purchase: a product and how many seats were bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasedProduct {
    /// Purchased product.
    pub product: Product,
    /// Number of seats purchased.
    pub quantity: u32,
}

impl PurchasedProduct {
    /// Create a purchase line.
    pub fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_products_in_grant_order() {
        let selection = ProductSelection {
            remote: false,
            meeting: true,
            drive: true,
        };
        assert_eq!(selection.products(), vec![Product::Meeting, Product::Drive]);
        assert!(!selection.is_empty());
        assert!(ProductSelection::default().is_empty());
    }

    #[test]
    fn test_selection_from_products() {
        let selection = ProductSelection::from_products(&[Product::Drive, Product::Remote]);
        assert!(selection.remote && selection.drive && !selection.meeting);
    }

    #[test]
    fn test_product_from_str() {
        assert_eq!("remote".parse::<Product>().unwrap(), Product::Remote);
        assert!("fax".parse::<Product>().is_err());
    }
}
