//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::collections::HashMap;

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
    routing::{get, post},
};
use gatekeeper::{AppState, auth::Verify, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const VALID_CODE: &str = "valid-code";
pub const ACCESS_TOKEN: &str = "mock-access-token";
pub const LANDING_PAGE: &str = "<h1>Welcome to the test landing page</h1>";

/// Profile served by the mock userinfo endpoint
pub fn mock_profile() -> serde_json::Value {
    serde_json::json!({
        "sub": "110248495921238986420",
        "email": "ada.lovelace@example.com",
        "email_verified": true,
        "picture": "https://lh3.googleusercontent.com/a/default-user",
    })
}

/// Stand-in for Google's token and userinfo endpoints
pub struct MockProvider {
    pub addr: String,
}

impl MockProvider {
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/token", post(mock_token))
            .route("/userinfo", get(mock_userinfo));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

async fn mock_token(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    let accepted = form.get("grant_type").map(String::as_str) == Some("authorization_code")
        && form.get("code").map(String::as_str) == Some(VALID_CODE)
        && form.get("client_id").map(String::as_str) == Some("test-client-id")
        && form.get("client_secret").map(String::as_str) == Some("test-client-secret");

    if !accepted {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Malformed auth code.",
            })),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "access_token": ACCESS_TOKEN,
            "refresh_token": "mock-refresh-token",
            "token_type": "Bearer",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/userinfo.email openid",
        })),
    )
}

async fn mock_userinfo(headers: HeaderMap) -> impl IntoResponse {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {ACCESS_TOKEN}").as_str());

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid_token" })),
        );
    }

    (StatusCode::OK, Json(mock_profile()))
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub provider: MockProvider,
    pub _public_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::build(|_| {}, |config| AppState::new(config).unwrap()).await
    }

    /// Create a test server with an adjusted configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        Self::build(adjust, |config| AppState::new(config).unwrap()).await
    }

    /// Create a test server with a custom verify hook
    pub async fn with_verifier(verifier: impl Verify) -> Self {
        Self::build(
            |_| {},
            move |config| AppState::with_verifier(config, verifier).unwrap(),
        )
        .await
    }

    async fn build(
        adjust: impl FnOnce(&mut config::AppConfig),
        make_state: impl FnOnce(config::AppConfig) -> AppState,
    ) -> Self {
        let provider = MockProvider::start().await;

        let public_dir = TempDir::new().unwrap();
        std::fs::write(public_dir.path().join("index.html"), LANDING_PAGE).unwrap();

        let mut config = test_config(&provider, &public_dir);
        adjust(&mut config);
        let state = make_state(config);

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let app = gatekeeper::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            provider,
            _public_dir: public_dir,
            client: no_redirect_client(),
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Run a successful login against the mock provider and return the
    /// `name=value` session cookie
    pub async fn login(&self) -> String {
        let response = self
            .client
            .get(self.url(&format!("/auth/google/callback?code={VALID_CODE}")))
            .send()
            .await
            .expect("request succeeds");

        assert_eq!(response.status(), 302);
        assert_eq!(location(&response), "/");
        session_cookie(&response).expect("login sets a session cookie")
    }

    /// Request `/secret`, optionally presenting a cookie
    pub async fn get_secret(&self, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url("/secret"));
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }
        request.send().await.expect("request succeeds")
    }
}

fn test_config(provider: &MockProvider, public_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_dir: public_dir.path().to_path_buf(),
            tls: config::TlsConfig {
                cert_path: "cert.pem".into(),
                key_path: "key.pem".into(),
            },
        },
        oauth: config::OAuthConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_url: "https://localhost:3000/auth/google/callback"
                .parse()
                .unwrap(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".parse().unwrap(),
            token_url: provider.url("/token").parse().unwrap(),
            userinfo_url: provider.url("/userinfo").parse().unwrap(),
            scopes: vec!["email".to_string()],
            request_timeout_seconds: 5,
        },
        session: config::SessionConfig {
            cookie_name: "session".to_string(),
            primary_key: "test-cookie-key-1-at-least-32-bytes".to_string(),
            secondary_key: "test-cookie-key-2-at-least-32-bytes".to_string(),
            max_age_seconds: 86_400,
            secure: false,
            persistence: config::SessionPersistence::Enabled,
        },
        routes: config::RoutesConfig {
            success_redirect: "/".to_string(),
            failure_redirect: "/failure".to_string(),
            logout_redirect: "/".to_string(),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// The `session=<token>` pair from a non-empty session Set-Cookie header
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with("session=") && pair.len() > "session=".len())
        .map(ToString::to_string)
}

/// The raw token inside a `session=<token>` pair
pub fn token_of(cookie: &str) -> &str {
    cookie.trim_start_matches("session=")
}
