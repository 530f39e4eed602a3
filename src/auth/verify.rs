//! Login verification hook
//!
//! Runs after the code exchange and profile fetch, and decides which
//! principal (if any) the new session is bound to.

use serde::{Deserialize, Serialize};

use super::provider::{Profile, TokenSet};

/// The authenticated identity attached to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub serde_json::Value);

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("login rejected: {0}")]
    Rejected(String),
}

/// Turns a provider profile into a session principal
pub trait Verify: Send + Sync + 'static {
    fn verify(&self, tokens: &TokenSet, profile: Profile) -> Result<Principal, VerifyError>;
}

/// Accepts every profile verbatim as the principal
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptProfile;

impl Verify for AcceptProfile {
    fn verify(&self, tokens: &TokenSet, profile: Profile) -> Result<Principal, VerifyError> {
        tracing::debug!(
            profile = %profile.0,
            has_refresh_token = tokens.refresh_token.is_some(),
            "Google profile"
        );
        Ok(Principal(profile.0))
    }
}
