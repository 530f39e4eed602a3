//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! The only server-side state is the list of sessions revoked by logout.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::RwLock;

use super::verify::Principal;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// User session data
///
/// Stored in a signed cookie. Carries the serialized principal verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (ULID), used for revocation
    pub id: String,
    /// Serialized principal, see [`serialize_user`]
    pub user: serde_json::Value,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a new session for a principal
    ///
    /// # Errors
    /// Returns error if `max_age_seconds` does not yield a representable
    /// expiry time
    pub fn new(principal: &Principal, max_age_seconds: i64) -> Result<Self, AppError> {
        let now = Utc::now();
        let expires_at = Duration::try_seconds(max_age_seconds)
            .and_then(|max_age| now.checked_add_signed(max_age))
            .ok_or_else(|| {
                AppError::Config(format!("session max age {max_age_seconds}s is out of range"))
            })?;

        Ok(Self {
            id: ulid::Ulid::new().to_string(),
            user: serialize_user(principal),
            created_at: now,
            expires_at,
        })
    }

    /// Principal this session is bound to
    pub fn principal(&self) -> Principal {
        deserialize_user(self.user.clone())
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Reduce a principal to its session-storable form.
///
/// The whole profile is stored.
pub fn serialize_user(principal: &Principal) -> serde_json::Value {
    principal.0.clone()
}

/// Reconstitute a principal from its stored form.
pub fn deserialize_user(stored: serde_json::Value) -> Principal {
    Principal(stored)
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(session: &Session, key: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// The signature is accepted if it matches any of `keys`, so a retired
/// signing key keeps its sessions alive until they expire.
///
/// # Errors
/// Returns error if signature is invalid, the token is malformed
/// or the session has expired
pub fn verify_session_token(token: &str, keys: &[&str]) -> Result<Session, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    let mut verified = false;
    for key in keys {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|e| AppError::Encryption(e.to_string()))?;
        mac.update(payload_b64.as_bytes());
        if mac.verify_slice(&signature).is_ok() {
            verified = true;
            break;
        }
    }
    if !verified {
        return Err(AppError::InvalidSignature);
    }

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;

    let session: Session =
        serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)?;

    if session.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(session)
}

/// Sessions ended by logout before their natural expiry
///
/// Entries are dropped once the session would have expired anyway.
#[derive(Debug, Default)]
pub struct SessionRevocations {
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SessionRevocations {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn revoke(&self, session: &Session) {
        let now = Utc::now();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires_at| *expires_at > now);
        revoked.insert(session.id.clone(), session.expires_at);
    }

    pub async fn is_revoked(&self, session_id: &str) -> bool {
        self.revoked.read().await.contains_key(session_id)
    }

    pub async fn revoked_count(&self) -> usize {
        self.revoked.read().await.len()
    }
}
