//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Login flow
    pub static ref AUTH_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gatekeeper_auth_events_total", "Total number of login flow events"),
        &["event", "outcome"]
    ).expect("metric can be created");

    // Access gate
    pub static ref ACCESS_DECISIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gatekeeper_access_decisions_total", "Total number of access gate decisions"),
        &["decision"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gatekeeper_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Must be called once per process.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(AUTH_EVENTS_TOTAL.clone()))
        .expect("AUTH_EVENTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ACCESS_DECISIONS_TOTAL.clone()))
        .expect("ACCESS_DECISIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
