//! Uchwala API Server
//!
//! Main entry point for the decision revocation service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use uchwala_api::{AppState, HttpSignatureVerifier, create_router};
use uchwala_core::storage::{StorageConfig, StorageService};
use uchwala_db::connect;
use uchwala_shared::config::{LogConfig, LogFormat};
use uchwala_shared::{AppConfig, JwtService};

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "uchwala=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match log.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.log);

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let jwt_service = JwtService::new(&config.jwt.secret);

    let storage = StorageService::from_config(StorageConfig::from(config.storage.clone()))
        .context("Failed to initialize document storage")?;
    info!(
        provider = storage.provider_name(),
        max_file_size = storage.config().max_file_size,
        "Document storage configured"
    );

    let verifier = HttpSignatureVerifier::from_config(&config.verifier)
        .context("Failed to build signature verifier client")?;
    info!(url = verifier.verify_url(), "Signature verifier configured");

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        storage: Arc::new(storage),
        verifier: Arc::new(verifier),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
