use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Create session cookie.
pub(super) fn session_cookie(
    name: &str,
    token: String,
    max_age_seconds: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age_seconds))
        .build()
}

/// Create removal cookie for session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Get the raw session token from cookies.
pub(super) fn get_session_token(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}
