//! Domain entities shared by the billhub crates.
//!
//! Rows map one-to-one onto the Postgres tables created by the
//! `billhub-database` migrations, and the same structs are what the bill
//! cache stores and what the HTTP layer returns.

pub mod account;
pub mod bill;
pub mod provider;
pub mod user;

pub use account::*;
pub use bill::*;
pub use provider::*;
pub use user::*;

/// Generate a new opaque identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
