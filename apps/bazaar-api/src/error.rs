//! # API Errors
//!
//! What HTTP clients see when something goes wrong.
//!
//! ```text
//! ValidationError / CoreError ──┐
//!                               ├──► ApiError ──► (status, {"code", "message"})
//! DbError ──────────────────────┘
//! ```
//!
//! Internal failures are logged with their detail and answered with a
//! generic message.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bazaar_core::CoreError;
use bazaar_db::DbError;
use serde::Serialize;
use tracing::error;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body, query or path.
    #[error("{0}")]
    BadRequest(String),

    /// Input parsed but failed a field rule.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Request conflicts with current state. The code names which rule.
    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// Detail is logged, never returned.
    #[error("Internal server error")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { code, .. } => *code,
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(%detail, "Request failed");
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Business rule → HTTP status.
///
/// ```text
/// *NotFound, NotInCart                         → 404
/// Validation, EmptyCart, CartTooLarge, ...     → 400
/// Forbidden                                    → 403
/// stock, transitions, duplicates, likes        → 409
/// ```
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::ReviewNotFound(_)
            | CoreError::NotInCart(_) => ApiError::NotFound(message),

            CoreError::Validation(v) => ApiError::Validation(v.to_string()),
            CoreError::EmptyCart
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. } => ApiError::Validation(message),

            CoreError::Forbidden(_) => ApiError::Forbidden(message),

            CoreError::ProductUnavailable(_) => ApiError::conflict("PRODUCT_UNAVAILABLE", message),
            CoreError::InsufficientStock { .. } => ApiError::conflict("INSUFFICIENT_STOCK", message),
            CoreError::InvalidOrderTransition { .. } => {
                ApiError::conflict("INVALID_TRANSITION", message)
            }
            CoreError::AlreadyReviewed { .. } => ApiError::conflict("ALREADY_REVIEWED", message),
            CoreError::AlreadyLiked => ApiError::conflict("ALREADY_LIKED", message),
            CoreError::NotLiked => ApiError::conflict("NOT_LIKED", message),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rule(core) => core.into(),
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::conflict("DUPLICATE", err.to_string()),
            DbError::ForeignKeyViolation { .. } => ApiError::conflict(
                "IN_USE",
                "The record is referenced by other records",
            ),
            DbError::Conflict(_) => ApiError::conflict("STALE_STATE", err.to_string()),
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<bazaar_core::ValidationError> for ApiError {
    fn from(err: bazaar_core::ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
