//! Plain pages around the login flow

use axum::{Router, routing::get};

use crate::AppState;
use crate::auth::CurrentUser;

/// Routes:
/// - GET /failure - Login failure page
pub fn pages_router() -> Router<AppState> {
    Router::new().route("/failure", get(failure))
}

/// GET /failure
async fn failure() -> &'static str {
    "Failed to log in!"
}

/// GET /secret
///
/// Mounted behind [`crate::auth::require_session`].
pub async fn secret(CurrentUser(session): CurrentUser) -> &'static str {
    tracing::debug!(session_id = %session.id, "Serving protected resource");
    "Your personal secret value is 42!"
}
