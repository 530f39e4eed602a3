//! Google OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with Google.

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::cookies;
use super::provider::ProviderError;
use super::session::{Session, create_session_token, verify_session_token};
use super::verify::{Principal, VerifyError};
use crate::AppState;
use crate::metrics::AUTH_EVENTS_TOTAL;

/// Create authentication router
///
/// Routes:
/// - GET /auth/google - Redirect to Google
/// - GET /auth/google/callback - OAuth callback
/// - GET|POST /auth/logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        .route("/auth/logout", get(logout).post(logout))
}

// =============================================================================
// Google OAuth
// =============================================================================

/// GET /auth/google
///
/// Redirects user to the Google consent screen. Nothing is stored locally.
async fn google_redirect(State(state): State<AppState>) -> Response {
    let url = state.provider.authorization_url();
    AUTH_EVENTS_TOTAL
        .with_label_values(&["start", "redirected"])
        .inc();
    found(url.as_str())
}

/// Query parameters from Google callback
#[derive(Debug, Deserialize)]
struct GoogleCallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Why a callback did not produce a principal
#[derive(Debug, thiserror::Error)]
enum LoginFailure {
    #[error("Google denied the request: {0}")]
    Denied(String),
    #[error("callback carried no authorization code")]
    MissingCode,
    #[error("token exchange failed: {0}")]
    Exchange(#[source] ProviderError),
    #[error("profile fetch failed: {0}")]
    Profile(#[source] ProviderError),
    #[error(transparent)]
    Rejected(#[from] VerifyError),
}

impl LoginFailure {
    fn label(&self) -> &'static str {
        match self {
            LoginFailure::Denied(_) => "denied",
            LoginFailure::MissingCode => "missing_code",
            LoginFailure::Exchange(_) => "exchange_failed",
            LoginFailure::Profile(_) => "profile_failed",
            LoginFailure::Rejected(_) => "rejected",
        }
    }
}

/// GET /auth/google/callback
///
/// # Steps
/// 1. Bail out on a provider error or a missing code
/// 2. Exchange code for tokens
/// 3. Fetch the profile
/// 4. Run the verify hook
/// 5. Create session and set cookie (when persistence is enabled)
/// 6. Redirect to home; any failure redirects to the failure page
///    without touching the cookie jar
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
    jar: CookieJar,
) -> Response {
    let failure_redirect = state.config.routes.failure_redirect.as_str();

    let principal = match complete_login(&state, query).await {
        Ok(principal) => principal,
        Err(failure) => {
            tracing::warn!(reason = failure.label(), error = %failure, "Google login failed");
            AUTH_EVENTS_TOTAL
                .with_label_values(&["callback", failure.label()])
                .inc();
            return found(failure_redirect);
        }
    };

    let success_redirect = state.config.routes.success_redirect.as_str();
    let session_config = &state.config.session;

    if !session_config.is_persistent() {
        tracing::info!("Google login successful (no session persistence)");
        AUTH_EVENTS_TOTAL
            .with_label_values(&["callback", "success"])
            .inc();
        return found(success_redirect);
    }

    let signed = Session::new(&principal, session_config.max_age_seconds).and_then(|session| {
        create_session_token(&session, &session_config.primary_key).map(|token| (session, token))
    });
    let (session, token) = match signed {
        Ok(signed) => signed,
        Err(error) => {
            tracing::error!(%error, "Session creation failed");
            AUTH_EVENTS_TOTAL
                .with_label_values(&["callback", "session_failed"])
                .inc();
            return found(failure_redirect);
        }
    };

    let cookie = cookies::session_cookie(
        &session_config.cookie_name,
        token,
        session_config.max_age_seconds,
        session_config.secure,
    );

    tracing::info!(session_id = %session.id, "Google login successful");
    AUTH_EVENTS_TOTAL
        .with_label_values(&["callback", "success"])
        .inc();

    (jar.add(cookie), found(success_redirect)).into_response()
}

async fn complete_login(
    state: &AppState,
    query: GoogleCallbackQuery,
) -> Result<Principal, LoginFailure> {
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        return Err(LoginFailure::Denied(
            format!("{error} {description}").trim().to_string(),
        ));
    }

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or(LoginFailure::MissingCode)?;

    let tokens = state
        .provider
        .exchange_code(&code)
        .await
        .map_err(LoginFailure::Exchange)?;

    let profile = state
        .provider
        .fetch_profile(&tokens.access_token)
        .await
        .map_err(LoginFailure::Profile)?;

    Ok(state.verifier.verify(&tokens, profile)?)
}

// =============================================================================
// Logout
// =============================================================================

/// GET|POST /auth/logout
///
/// Revokes the presented session, clears the cookie and redirects home.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session_config = &state.config.session;

    if let Some(token) = cookies::get_session_token(&jar, &session_config.cookie_name) {
        match verify_session_token(&token, &session_config.verification_keys()) {
            Ok(session) => {
                state.revocations.revoke(&session).await;
                tracing::info!(session_id = %session.id, "Session logged out");
            }
            Err(error) => tracing::debug!(%error, "Ignoring invalid session cookie on logout"),
        }
    }

    AUTH_EVENTS_TOTAL
        .with_label_values(&["logout", "cleared"])
        .inc();

    let clear_cookie = cookies::clear_session_cookie(&session_config.cookie_name);
    (
        jar.remove(clear_cookie),
        found(&state.config.routes.logout_redirect),
    )
        .into_response()
}

// =============================================================================
// Helpers
// =============================================================================

/// 302 Found to `location`
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}
