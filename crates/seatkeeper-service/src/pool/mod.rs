//! License pool: the single owner of plan, product and seat state.

pub mod manager;
pub mod purchase;

pub use manager::LicensePoolManager;
pub use purchase::PurchaseRequest;
