//! Liveness and database check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use bazaar_db::migrations::migration_status;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
    /// Applied / embedded schema migrations.
    pub migrations: (usize, usize),
    pub server_time: String,
}

/// 200 when the database answers, 503 otherwise.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    if !database {
        warn!("Health check: database unreachable");
    }

    let migrations = match migration_status(state.db.pool()).await {
        Ok((total, applied)) => (applied, total),
        Err(e) => {
            warn!(error = %e, "Health check: migration status unavailable");
            (0, 0)
        }
    };

    let (status, label) = if database {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            version: env!("CARGO_PKG_VERSION"),
            database,
            migrations,
            server_time: chrono::Utc::now().to_rfc3339(),
        }),
    )
}
