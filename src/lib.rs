//! Gatekeeper - Google OAuth2 login in front of a protected resource
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HTTPS (axum-server, rustls)               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Router (Axum)                           │
//! │  - /auth/google, /auth/google/callback, /auth/logout        │
//! │  - /secret behind the access gate                           │
//! │  - /, /failure, /health, /metrics                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Auth                                  │
//! │  - Google client (code exchange, userinfo)                  │
//! │  - Verify hook                                              │
//! │  - HMAC-signed cookie sessions, logout revocations          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: failure/protected pages and the metrics endpoint
//! - `auth`: Google OAuth flow, sessions and access gate
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Everything here is immutable after startup except the
/// revocation list.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Google OAuth client
    pub provider: Arc<auth::GoogleClient>,

    /// Hook deciding the principal of a new session
    pub verifier: Arc<dyn auth::Verify>,

    /// Sessions ended by logout
    pub revocations: Arc<auth::SessionRevocations>,
}

impl AppState {
    /// Initialize application state with the default verify hook
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        Self::with_verifier(config, auth::AcceptProfile)
    }

    /// Initialize application state with a custom verify hook
    pub fn with_verifier(
        config: config::AppConfig,
        verifier: impl auth::Verify,
    ) -> Result<Self, error::AppError> {
        let provider = auth::GoogleClient::new(config.oauth.clone())?;

        Ok(Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            verifier: Arc::new(verifier),
            revocations: Arc::new(auth::SessionRevocations::new()),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware, routing::get};
    use tower_http::{services::ServeFile, trace::TraceLayer};

    let landing_page = ServeFile::new(state.config.server.public_dir.join("index.html"));

    let protected = Router::new()
        .route("/secret", get(api::secret))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let router = Router::new()
        .route("/health", get(health_check))
        .route_service("/", landing_page)
        .merge(auth::auth_router())
        .merge(api::pages_router())
        .merge(protected)
        .with_state(state)
        .merge(api::metrics_router());

    with_security_headers(router).layer(TraceLayer::new_for_http())
}

/// Default hardening headers, left alone when a handler sets its own
fn with_security_headers(router: axum::Router) -> axum::Router {
    use axum::http::{HeaderName, HeaderValue, header};
    use tower_http::set_header::SetResponseHeaderLayer;

    let defaults: [(HeaderName, &'static str); 4] = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
        (header::REFERRER_POLICY, "no-referrer"),
        (
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=15552000; includeSubDomains",
        ),
    ];

    defaults.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ))
    })
}

async fn health_check() -> &'static str {
    "OK"
}
