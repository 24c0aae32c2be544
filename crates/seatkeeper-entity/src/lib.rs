//! # seatkeeper-entity
//!
//! Domain entity models for Seatkeeper. Structs in this crate represent a
//! database row, a TTL record, or a domain value object. Database entities
//! additionally derive `sqlx::FromRow`; status enums map to PostgreSQL enum
//! types.

pub mod account;
pub mod authorization;
pub mod invite;
pub mod license;
pub mod workspace;
