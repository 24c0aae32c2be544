//! Cross-crate scenarios over the in-memory store, TTL cache and mock
//! collaborators.

mod helpers;

mod authorization_test;
mod invite_test;
mod provisioning_test;
mod seat_pool_test;
