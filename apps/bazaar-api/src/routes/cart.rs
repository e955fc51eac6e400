//! The signed-in customer's cart.
//!
//! Every response carries the lines at live prices plus totals; prices are
//! only frozen when the cart is checked out.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use bazaar_core::cart::{Cart, CartLine, CartTotals};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(get_cart).delete(clear_cart))
        .route("/api/cart/items", post(add_item))
        .route(
            "/api/cart/items/{product_id}",
            put(set_quantity).delete(remove_item),
        )
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        let totals = cart.totals();
        CartResponse {
            lines: cart.lines,
            totals,
        }
    }
}

async fn get_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<ApiJson<CartResponse>> {
    let cart = state.db.carts().load(user.tenant(), user.id()).await?;
    Ok(ApiJson(cart.into()))
}

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<AddItem>,
) -> ApiResult<ApiJson<CartResponse>> {
    let cart = state
        .db
        .carts()
        .add(user.tenant(), user.id(), &body.product_id, body.quantity)
        .await?;
    Ok(ApiJson(cart.into()))
}

#[derive(Debug, Deserialize)]
pub struct SetQuantity {
    pub quantity: i64,
}

/// Zero removes the line.
async fn set_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<String>,
    ApiJson(body): ApiJson<SetQuantity>,
) -> ApiResult<ApiJson<CartResponse>> {
    let cart = state
        .db
        .carts()
        .set_quantity(user.tenant(), user.id(), &product_id, body.quantity)
        .await?;
    Ok(ApiJson(cart.into()))
}

async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<String>,
) -> ApiResult<ApiJson<CartResponse>> {
    let cart = state
        .db
        .carts()
        .remove(user.tenant(), user.id(), &product_id)
        .await?;
    Ok(ApiJson(cart.into()))
}

async fn clear_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<StatusCode> {
    state.db.carts().clear(user.tenant(), user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
