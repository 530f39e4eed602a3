//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (GATEKEEPER__*)
//! 4. The bare credential variables (CLIENT_ID, CLIENT_SECRET,
//!    COOKIE_KEY_1, COOKIE_KEY_2)

use serde::Deserialize;
use std::{net::SocketAddr, path::PathBuf};
use url::Url;

use crate::auth::provider::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GOOGLE_USERINFO_URL};
use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub session: SessionConfig,
    pub routes: RoutesConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (default: 3000)
    pub port: u16,
    /// Directory holding the landing page (`index.html`)
    pub public_dir: PathBuf,
    pub tls: TlsConfig,
}

impl ServerConfig {
    /// Socket address the HTTPS listener binds to
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("server.host/server.port: {e}")))
    }
}

/// TLS material, read from local PEM files at startup
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Google OAuth client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Absolute URL of `/auth/google/callback` as registered with Google
    pub redirect_url: Url,
    pub auth_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
    /// Scopes requested on the consent screen (default: `["email"]`)
    pub scopes: Vec<String>,
    /// Timeout applied to token and userinfo requests
    pub request_timeout_seconds: u64,
}

/// Whether a successful login is bound to a cookie session
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionPersistence {
    #[default]
    Enabled,
    Disabled,
}

/// Session cookie configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie name (default: "session")
    pub cookie_name: String,
    /// Signing key for new sessions (COOKIE_KEY_1)
    pub primary_key: String,
    /// Additional key accepted when verifying (COOKIE_KEY_2)
    pub secondary_key: String,
    /// Session max age in seconds (default: 86400 = 24h)
    pub max_age_seconds: i64,
    /// Mark the cookie `Secure` (default: true)
    pub secure: bool,
    #[serde(default)]
    pub persistence: SessionPersistence,
}

impl SessionConfig {
    /// Keys accepted when verifying a session cookie, signing key first
    pub fn verification_keys(&self) -> Vec<&str> {
        vec![self.primary_key.as_str(), self.secondary_key.as_str()]
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence == SessionPersistence::Enabled
    }
}

/// Redirect targets used by the login flow
#[derive(Debug, Clone, Deserialize)]
pub struct RoutesConfig {
    pub success_redirect: String,
    pub failure_redirect: String,
    pub logout_redirect: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Errors
    /// Returns error if a required value is missing or invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.public_dir", "public")?
            .set_default("server.tls.cert_path", "cert.pem")?
            .set_default("server.tls.key_path", "key.pem")?
            .set_default(
                "oauth.redirect_url",
                "https://localhost:3000/auth/google/callback",
            )?
            .set_default("oauth.auth_url", GOOGLE_AUTH_URL)?
            .set_default("oauth.token_url", GOOGLE_TOKEN_URL)?
            .set_default("oauth.userinfo_url", GOOGLE_USERINFO_URL)?
            .set_default("oauth.scopes", vec!["email"])?
            .set_default("oauth.request_timeout_seconds", 30)?
            .set_default("session.cookie_name", "session")?
            .set_default("session.max_age_seconds", 86400)?
            .set_default("session.secure", true)?
            .set_default("session.persistence", "enabled")?
            .set_default("routes.success_redirect", "/")?
            .set_default("routes.failure_redirect", "/failure")?
            .set_default("routes.logout_redirect", "/")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("GATEKEEPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("oauth.client_id", std::env::var("CLIENT_ID").ok())?
            .set_override_option("oauth.client_secret", std::env::var("CLIENT_SECRET").ok())?
            .set_override_option("session.primary_key", std::env::var("COOKIE_KEY_1").ok())?
            .set_override_option("session.secondary_key", std::env::var("COOKIE_KEY_2").ok())?
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        const MIN_COOKIE_KEY_BYTES: usize = 32;
        // Browsers cap cookie lifetimes at 400 days
        const MAX_SESSION_AGE_SECONDS: i64 = 400 * 24 * 60 * 60;

        if self.oauth.client_id.trim().is_empty() {
            return Err(AppError::Config("CLIENT_ID must not be empty".to_string()));
        }

        if self.oauth.client_secret.trim().is_empty() {
            return Err(AppError::Config(
                "CLIENT_SECRET must not be empty".to_string(),
            ));
        }

        if self.oauth.scopes.is_empty() {
            return Err(AppError::Config(
                "oauth.scopes must name at least one scope".to_string(),
            ));
        }

        for (name, key) in [
            ("COOKIE_KEY_1", &self.session.primary_key),
            ("COOKIE_KEY_2", &self.session.secondary_key),
        ] {
            if key.trim().is_empty() {
                return Err(AppError::Config(format!("{name} must not be empty")));
            }
            if key.len() < MIN_COOKIE_KEY_BYTES {
                return Err(AppError::Config(format!(
                    "{name} must be at least {MIN_COOKIE_KEY_BYTES} bytes"
                )));
            }
        }

        if self.session.max_age_seconds <= 0 {
            return Err(AppError::Config(
                "session.max_age_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.max_age_seconds > MAX_SESSION_AGE_SECONDS {
            return Err(AppError::Config(format!(
                "session.max_age_seconds must not exceed {MAX_SESSION_AGE_SECONDS}"
            )));
        }

        if !self.session.secure {
            tracing::warn!("Session cookies are not marked Secure");
        }

        if !self.session.is_persistent() {
            tracing::warn!("Session persistence disabled; /secret will deny every request");
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            public_dir: PathBuf::from("public"),
            tls: TlsConfig {
                cert_path: PathBuf::from("cert.pem"),
                key_path: PathBuf::from("key.pem"),
            },
        },
        oauth: OAuthConfig {
            client_id: "google-client-id".to_string(),
            client_secret: "google-client-secret".to_string(),
            redirect_url: "https://localhost:3000/auth/google/callback"
                .parse()
                .unwrap(),
            auth_url: GOOGLE_AUTH_URL.parse().unwrap(),
            token_url: GOOGLE_TOKEN_URL.parse().unwrap(),
            userinfo_url: GOOGLE_USERINFO_URL.parse().unwrap(),
            scopes: vec!["email".to_string()],
            request_timeout_seconds: 30,
        },
        session: SessionConfig {
            cookie_name: "session".to_string(),
            primary_key: "k".repeat(32),
            secondary_key: "q".repeat(32),
            max_age_seconds: 86_400,
            secure: true,
            persistence: SessionPersistence::Enabled,
        },
        routes: RoutesConfig {
            success_redirect: "/".to_string(),
            failure_redirect: "/failure".to_string(),
            logout_redirect: "/".to_string(),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
