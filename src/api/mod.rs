//! API layer
//!
//! HTTP handlers for:
//! - Failure and protected pages
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;

pub use metrics::metrics_router;
pub use pages::{pages_router, secret};
