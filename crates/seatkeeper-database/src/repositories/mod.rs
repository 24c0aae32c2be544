//! PostgreSQL implementations of the store traits.

pub mod license;
pub mod membership;

pub use license::LicenseRepository;
pub use membership::MembershipRepository;

use seatkeeper_core::error::{AppError, ErrorKind};

/// Map an sqlx error, turning unique-constraint violations into conflicts.
pub(crate) fn map_write_error(message: &'static str, e: sqlx::Error) -> AppError {
    let unique = e
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if unique {
        AppError::with_source(ErrorKind::Conflict, message, e)
    } else {
        AppError::with_source(ErrorKind::Database, message, e)
    }
}
