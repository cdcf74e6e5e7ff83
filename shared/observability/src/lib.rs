//! Billhub Observability Library
//!
//! Structured logging setup and HTTP request logging shared by the billhub
//! binaries.

pub mod init;
pub mod middleware;

pub use init::*;
pub use middleware::*;

// Re-export tracing for convenience
pub use tracing::{debug, error, info, warn, trace, instrument, Instrument};
