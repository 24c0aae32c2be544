//! Accounts as seen through the identity service.

pub mod model;

pub use model::{Account, NewAccount};
