//! Gatekeeper binary entry point

use axum_server::tls_rustls::RustlsConfig;
use gatekeeper::{AppState, config, error::AppError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load `.env` and configuration
/// 2. Initialize tracing/logging and metrics
/// 3. Load TLS material
/// 4. Build AppState and the Axum router
/// 5. Start HTTPS server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration; missing credentials abort startup
    let dotenv_path = dotenvy::dotenv().ok();
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    init_tracing(&config.logging);
    tracing::info!("Starting Gatekeeper...");
    if let Some(path) = dotenv_path {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    gatekeeper::metrics::init_metrics();

    // 3. Load TLS material
    let tls = &config.server.tls;
    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| {
            AppError::Config(format!(
                "failed to load TLS material from {} and {}: {e}",
                tls.cert_path.display(),
                tls.key_path.display()
            ))
        })?;

    // 4. Initialize application state and router
    let addr = config.server.socket_addr()?;
    let state = AppState::new(config)?;
    let app = gatekeeper::build_router(state);

    // 5. Start server
    tracing::info!("Listening on port {}...", addr.port());
    axum_server::bind_rustls(addr, rustls_config)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("gatekeeper={},tower_http=debug", logging.level).into()
    });

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
