//! Billing service: bill-fetch orchestration over linked provider accounts
//! and the HTTP surface exposing it.

pub mod errors;
pub mod handlers;
pub mod services;

pub use errors::ServiceError;
pub use handlers::{configure_routes, AppState, UserId};
