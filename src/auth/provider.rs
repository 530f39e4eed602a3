//! Google OAuth 2.0 client
//!
//! Builds the consent-screen URL, exchanges authorization codes for
//! tokens and fetches the signed-in user's profile.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::OAuthConfig;
use crate::error::AppError;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Errors talking to the identity provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} failed with status {status}: {detail}")]
    Status {
        operation: &'static str,
        status: u16,
        detail: String,
    },
}

/// Tokens returned by the token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Profile returned by the userinfo endpoint
///
/// Kept as an opaque JSON document; no claim is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(pub serde_json::Value);

/// Google OAuth client
///
/// Holds the immutable client credentials and a pooled HTTP client.
pub struct GoogleClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl GoogleClient {
    pub fn new(config: OAuthConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("Gatekeeper/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(
                config.request_timeout_seconds,
            ))
            .build()?;

        Ok(Self { config, http })
    }

    /// Consent-screen URL for the configured scopes
    pub fn authorization_url(&self) -> Url {
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_url.as_str())
            .append_pair("scope", &scope);
        url
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// Returns [`ProviderError::Http`] on network failure, or
    /// [`ProviderError::Status`] if Google rejects the code.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let response = ensure_success(response, "token exchange").await?;
        Ok(response.json::<TokenSet>().await?)
    }

    /// Fetch the user's profile with an access token
    pub async fn fetch_profile(&self, access_token: &str) -> Result<Profile, ProviderError> {
        let response = self
            .http
            .get(self.config.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = ensure_success(response, "userinfo request").await?;
        Ok(response.json::<Profile>().await?)
    }
}

async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let detail = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        operation,
        status,
        detail,
    })
}
