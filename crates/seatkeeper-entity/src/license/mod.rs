//! License pool entities: plans, product pools, seats and usage.

pub mod model;
pub mod product;
pub mod status;
pub mod usage;

pub use model::{LicensePlan, LicenseProduct, NewLicensePlan, PlanTopUp, Seat};
pub use product::{Product, ProductSelection, PurchasedProduct};
pub use status::{PlanStatus, ProductStatus, SeatStatus};
pub use usage::{PlanUsage, ProductUsage, ResourceTotals, SeatCaps};
