//! # Order Routes
//!
//! Checkout and the customer's order history, plus the back-office order
//! desk: filtered listing, status changes, tracking and notes.
//!
//! ```text
//! POST /api/checkout                      cart → pending order
//! GET  /api/orders[/{id}]                 own orders only
//! POST /api/orders/{id}/cancel            pending only, restocks
//! GET  /api/admin/orders[/stats|/{id}]
//! PATCH /api/admin/orders/{id}/status|tracking|notes
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Router;
use bazaar_core::orders::{OrderFilter, OrderSort};
use bazaar_core::pagination::Page;
use bazaar_core::stats::OrderStats;
use bazaar_core::{Order, OrderStatus};
use bazaar_db::OrderDetail;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, PageParams};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/checkout", post(checkout))
        .route("/api/orders", get(my_orders))
        .route("/api/orders/{id}", get(my_order))
        .route("/api/orders/{id}/cancel", post(cancel_order))
        .route("/api/admin/orders", get(admin_orders))
        .route("/api/admin/orders/stats", get(order_stats))
        .route("/api/admin/orders/{id}", get(admin_order))
        .route("/api/admin/orders/{id}/status", patch(update_status))
        .route("/api/admin/orders/{id}/tracking", patch(update_tracking))
        .route("/api/admin/orders/{id}/notes", patch(update_notes))
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    /// Falls back to the default address when absent.
    #[serde(default)]
    pub shipping_address_id: Option<String>,
}

async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, ApiJson<OrderDetail>)> {
    let detail = state
        .db
        .orders()
        .checkout(user.tenant(), user.id(), body.shipping_address_id.as_deref())
        .await?;
    info!(
        user = %user.id(),
        order = %detail.order.id,
        total_cents = detail.order.total_cents,
        "Order placed"
    );
    Ok((StatusCode::CREATED, ApiJson(detail)))
}

async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<ApiJson<Page<Order>>> {
    let orders = state
        .db
        .orders()
        .list_for_user(user.tenant(), user.id(), page.request())
        .await?;
    Ok(ApiJson(orders))
}

/// Someone else's order is reported as missing.
async fn my_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<OrderDetail>> {
    Ok(ApiJson(
        state
            .db
            .orders()
            .get_for_user(user.tenant(), user.id(), &id)
            .await?,
    ))
}

async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<Order>> {
    let order = state
        .db
        .orders()
        .cancel_by_customer(user.tenant(), user.id(), &id)
        .await?;
    info!(user = %user.id(), order = %id, "Order cancelled by customer");
    Ok(ApiJson(order))
}

// =============================================================================
// Back office
// =============================================================================

/// Totals are in cents.
#[derive(Debug, Default, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
    pub user_id: Option<String>,
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub min_total: Option<i64>,
    pub max_total: Option<i64>,
    pub sort_by: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn admin_orders(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiQuery(query): ApiQuery<AdminOrderQuery>,
) -> ApiResult<ApiJson<Page<Order>>> {
    let sort = match query.sort_by.as_deref() {
        Some(raw) => raw.parse::<OrderSort>()?,
        None => OrderSort::default(),
    };
    let filter = OrderFilter {
        status: query.status,
        user_id: query.user_id.filter(|u| !u.trim().is_empty()),
        search: query.search,
        date_from: query.date_from,
        date_to: query.date_to,
        min_total_cents: query.min_total,
        max_total_cents: query.max_total,
    };
    let page = PageParams {
        page: query.page,
        page_size: query.page_size,
    };

    let orders = state
        .db
        .orders()
        .list(admin.tenant(), &filter, sort, page.request())
        .await?;
    Ok(ApiJson(orders))
}

async fn order_stats(
    State(state): State<AppState>,
    admin: AdminUser,
) -> ApiResult<ApiJson<OrderStats>> {
    Ok(ApiJson(state.db.orders().stats(admin.tenant()).await?))
}

async fn admin_order(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<OrderDetail>> {
    Ok(ApiJson(state.db.orders().get(admin.tenant(), &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    #[serde(default)]
    pub comment: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<StatusChange>,
) -> ApiResult<ApiJson<Order>> {
    let order = state
        .db
        .orders()
        .update_status(
            admin.tenant(),
            &id,
            body.status,
            body.comment.as_deref(),
            admin.id(),
        )
        .await?;
    info!(admin = %admin.id(), order = %id, status = %order.status, "Order status changed");
    Ok(ApiJson(order))
}

#[derive(Debug, Deserialize)]
pub struct TrackingUpdate {
    pub tracking_number: String,
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

async fn update_tracking(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<TrackingUpdate>,
) -> ApiResult<ApiJson<Order>> {
    Ok(ApiJson(
        state
            .db
            .orders()
            .update_tracking(
                admin.tenant(),
                &id,
                &body.tracking_number,
                body.estimated_delivery,
                admin.id(),
            )
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct NotesUpdate {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Blank notes clear the field.
async fn update_notes(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<NotesUpdate>,
) -> ApiResult<ApiJson<Order>> {
    Ok(ApiJson(
        state
            .db
            .orders()
            .update_notes(admin.tenant(), &id, body.notes.as_deref())
            .await?,
    ))
}
