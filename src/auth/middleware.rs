//! Access gate
//!
//! Protects routes that require a logged-in session.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::cookies;
use super::session::{Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::ACCESS_DECISIONS_TOTAL;

/// Decide whether a request may reach a protected handler
///
/// Allows iff the request carries a session cookie that verifies under
/// one of the configured keys, has not expired and was not revoked
/// by logout. Without session persistence nothing is ever allowed.
pub async fn check_access(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    if !state.config.session.is_persistent() {
        return Err(AppError::Unauthorized);
    }

    let jar = CookieJar::from_headers(headers);
    let token = cookies::get_session_token(&jar, &state.config.session.cookie_name)
        .ok_or(AppError::Unauthorized)?;

    let session = verify_session_token(&token, &state.config.session.verification_keys())
        .map_err(|error| {
            tracing::debug!(%error, "Rejected session cookie");
            AppError::Unauthorized
        })?;

    if state.revocations.is_revoked(&session.id).await {
        tracing::debug!(session_id = %session.id, "Rejected revoked session");
        return Err(AppError::Unauthorized);
    }

    Ok(session)
}

/// Middleware to require a session
///
/// Adds the verified [`Session`] to request extensions.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/secret", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_session));
/// ```
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = match check_access(request.headers(), &state).await {
        Ok(session) => session,
        Err(error) => {
            ACCESS_DECISIONS_TOTAL.with_label_values(&["deny"]).inc();
            return Err(error);
        }
    };

    ACCESS_DECISIONS_TOTAL.with_label_values(&["allow"]).inc();
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Extractor for the current session
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(session): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", session.principal().0["email"])
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let state = AppState::from_ref(state);
        let session = check_access(&parts.headers, &state).await?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}
