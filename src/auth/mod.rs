//! Google OAuth authentication
//!
//! Handles:
//! - Google OAuth flow
//! - Session management
//! - Access gate middleware

mod cookies;
mod middleware;
mod oauth;
pub mod provider;
pub mod session;
pub mod verify;

pub use middleware::{CurrentUser, check_access, require_session};
pub use oauth::auth_router;
pub use provider::{GoogleClient, Profile, TokenSet};
pub use session::{
    Session, SessionRevocations, create_session_token, deserialize_user, serialize_user,
    verify_session_token,
};
pub use verify::{AcceptProfile, Principal, Verify, VerifyError};
