//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for decisions and revocation requests
//! - Bearer token authentication middleware
//! - The HTTP client for the signature verification service
//! - Error to response mapping

pub mod error;
pub mod middleware;
pub mod routes;
pub mod verifier;

use axum::{Router, extract::DefaultBodyLimit};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uchwala_core::revocation::RevocationService;
use uchwala_core::storage::StorageService;
use uchwala_db::{DecisionRepository, RevocationRepository};
use uchwala_shared::JwtService;

pub use error::ApiError;
pub use verifier::HttpSignatureVerifier;

/// Multipart framing and the JSON payload part on top of the document itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Revocation service wired to Postgres and the HTTP verifier.
pub type AppRevocationService = RevocationService<RevocationRepository, HttpSignatureVerifier>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Document storage.
    pub storage: Arc<StorageService>,
    /// Signature verification client.
    pub verifier: Arc<HttpSignatureVerifier>,
}

impl AppState {
    /// Decision repository on the shared pool.
    #[must_use]
    pub fn decisions(&self) -> DecisionRepository {
        DecisionRepository::new((*self.db).clone())
    }

    /// Revocation service on the shared pool, storage and verifier.
    #[must_use]
    pub fn revocations(&self) -> AppRevocationService {
        RevocationService::new(
            Arc::new(RevocationRepository::new((*self.db).clone())),
            Arc::clone(&self.storage),
            Arc::clone(&self.verifier),
        )
    }

    fn body_limit(&self) -> usize {
        usize::try_from(self.storage.config().max_file_size)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.body_limit();

    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::time::Duration;
    use uchwala_core::storage::{StorageConfig, StorageProvider};
    use uchwala_shared::types::{BusinessProfileId, UserId};

    pub const SECRET: &str = "test-secret-key-for-testing";

    /// State with a disconnected database: enough for routes that fail
    /// before touching Postgres.
    pub fn state() -> AppState {
        state_with_db(DatabaseConnection::Disconnected)
    }

    /// State over the given connection, usually a `MockDatabase`.
    pub fn state_with_db(db: DatabaseConnection) -> AppState {
        let root = std::env::temp_dir().join("uchwala-api-tests");
        let storage = StorageService::from_config(StorageConfig::new(StorageProvider::LocalFs {
            root,
        }))
        .expect("local storage");

        AppState {
            db: Arc::new(db),
            jwt_service: Arc::new(JwtService::new(SECRET)),
            storage: Arc::new(storage),
            verifier: Arc::new(
                HttpSignatureVerifier::new("http://127.0.0.1:9", Duration::from_secs(1))
                    .expect("verifier client"),
            ),
        }
    }

    /// Five-minute token for `user` in `bp`.
    pub fn token(state: &AppState, user: UserId, bp: BusinessProfileId, role: &str) -> String {
        state
            .jwt_service
            .issue_token(user, bp, role, chrono::Duration::minutes(5))
            .expect("token")
    }
}
