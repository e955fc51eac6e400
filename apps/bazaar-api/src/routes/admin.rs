//! Back-office user management and the dashboard.
//!
//! An admin cannot demote, deactivate or delete their own account; that
//! would lock the last admin out of the store.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Router;
use bazaar_core::pagination::Page;
use bazaar_core::stats::{DashboardStats, UserStats};
use bazaar_core::{User, UserRole, UserStatus};
use bazaar_db::UserFilter;
use serde::Deserialize;
use tracing::info;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, PageParams};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/stats", get(user_stats))
        .route(
            "/api/admin/users/{id}",
            patch(update_access).delete(delete_user),
        )
        .route("/api/admin/dashboard", get(dashboard))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list_users(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<ApiJson<Page<User>>> {
    let filter = UserFilter {
        role: query.role,
        status: query.status,
        search: query.search,
    };
    let page = PageParams {
        page: query.page,
        page_size: query.page_size,
    };
    Ok(ApiJson(
        state
            .db
            .users()
            .list(admin.tenant(), &filter, page.request())
            .await?,
    ))
}

async fn user_stats(
    State(state): State<AppState>,
    admin: AdminUser,
) -> ApiResult<ApiJson<UserStats>> {
    Ok(ApiJson(state.db.users().stats(admin.tenant()).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessChange {
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

impl AccessChange {
    /// True when applying this to oneself would drop admin access.
    fn locks_out_self(&self) -> bool {
        matches!(self.role, Some(UserRole::Customer))
            || matches!(self.status, Some(UserStatus::Inactive))
    }
}

async fn update_access(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(change): ApiJson<AccessChange>,
) -> ApiResult<ApiJson<User>> {
    if change.role.is_none() && change.status.is_none() {
        return Err(ApiError::BadRequest(
            "Nothing to change: send role and/or status".to_string(),
        ));
    }
    if id == admin.id() && change.locks_out_self() {
        return Err(ApiError::Forbidden(
            "Admins cannot demote or deactivate themselves".to_string(),
        ));
    }

    let user = state
        .db
        .users()
        .update_access(admin.tenant(), &id, change.role, change.status)
        .await?;
    info!(admin = %admin.id(), user = %id, role = %user.role, status = %user.status, "User access updated");
    Ok(ApiJson(user))
}

async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    if id == admin.id() {
        return Err(ApiError::Forbidden(
            "Admins cannot delete themselves".to_string(),
        ));
    }
    state.db.users().delete(admin.tenant(), &id).await?;
    info!(admin = %admin.id(), user = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<AppState>,
    admin: AdminUser,
) -> ApiResult<ApiJson<DashboardStats>> {
    Ok(ApiJson(state.db.dashboard_stats(admin.tenant()).await?))
}
