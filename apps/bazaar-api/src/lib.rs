//! # Bazaar API
//!
//! JSON HTTP API for the storefront and the admin back office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Bazaar API                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Storefront    │  │  Account       │  │  Back office (/api/admin)  ││
//! │  │                │  │                │  │                            ││
//! │  │ • categories   │  │ • /api/me      │  │ • catalog CRUD, stock      ││
//! │  │ • products     │  │ • addresses    │  │ • orders, status, tracking ││
//! │  │ • reviews      │  │ • favorites    │  │ • users, roles             ││
//! │  │ • cart/checkout│  │ • own orders   │  │ • dashboard, review purge  ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  Every handler: extract → bazaar-db repository → Json | ApiError       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`ApiConfig`]):
//! - `BAZAAR_HTTP_PORT` - listen port (default: 8080)
//! - `BAZAAR_DATABASE_PATH` - SQLite file (default: ./bazaar_dev.db)
//! - `BAZAAR_DB_MAX_CONNECTIONS` - pool size (default: 10)
//! - `BAZAAR_JWT_SECRET` - HS256 secret
//! - `BAZAAR_JWT_LIFETIME_SECS` - lifetime of dev tokens (default: 3600)
//! - `BAZAAR_CORS_ORIGIN` - allowed frontend origin

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use bazaar_db::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// Re-exports
pub use auth::JwtManager;
pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        AppState {
            db,
            jwt: Arc::new(jwt),
        }
    }
}

/// Builds the full router with request tracing.
pub fn build_router(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for the configured frontend origin.
pub fn cors_layer(config: &ApiConfig) -> Result<CorsLayer, ConfigError> {
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|_| ConfigError::InvalidValue("BAZAAR_CORS_ORIGIN".to_string()))?;

    Ok(CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(auth::TENANT_HEADER),
        ])
        .max_age(Duration::from_secs(3600)))
}
