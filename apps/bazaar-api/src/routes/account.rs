//! The signed-in user's own profile, address book and favorites.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use bazaar_core::{AddressInput, Product, ProfileUpdate, ShippingAddress, User};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me).patch(update_me))
        .route("/api/me/addresses", get(list_addresses).post(create_address))
        .route(
            "/api/me/addresses/{id}",
            put(update_address).delete(delete_address),
        )
        .route("/api/me/addresses/{id}/default", post(set_default_address))
        .route("/api/me/favorites", get(list_favorites))
        .route(
            "/api/me/favorites/{product_id}",
            put(add_favorite).delete(remove_favorite),
        )
}

// =============================================================================
// Profile
// =============================================================================

/// Also stamps `last_login_at`; clients call this once per session.
async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<ApiJson<User>> {
    Ok(ApiJson(
        state.db.users().touch_login(user.tenant(), user.id()).await?,
    ))
}

async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<ApiJson<User>> {
    Ok(ApiJson(
        state
            .db
            .users()
            .update_profile(user.tenant(), user.id(), &update)
            .await?,
    ))
}

// =============================================================================
// Addresses
// =============================================================================

async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiJson<Vec<ShippingAddress>>> {
    Ok(ApiJson(state.db.addresses().list(user.id()).await?))
}

async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<AddressInput>,
) -> ApiResult<(StatusCode, ApiJson<ShippingAddress>)> {
    let address = state.db.addresses().create(user.id(), &input).await?;
    Ok((StatusCode::CREATED, ApiJson(address)))
}

async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<AddressInput>,
) -> ApiResult<ApiJson<ShippingAddress>> {
    Ok(ApiJson(
        state.db.addresses().update(user.id(), &id, &input).await?,
    ))
}

async fn set_default_address(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<ShippingAddress>> {
    Ok(ApiJson(state.db.addresses().set_default(user.id(), &id).await?))
}

async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.db.addresses().delete(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Favorites
// =============================================================================

async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiJson<Vec<Product>>> {
    Ok(ApiJson(
        state.db.favorites().list(user.tenant(), user.id()).await?,
    ))
}

/// Idempotent.
async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state
        .db
        .favorites()
        .add(user.tenant(), user.id(), &product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Idempotent; removing something not favorited is not an error.
async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.db.favorites().remove(user.id(), &product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
