//! # Review Routes
//!
//! Product reviews, replies and likes.
//!
//! Every mutating handler logs the [`ReviewEvent`]s its repository call
//! returned, tagged with the tenant.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Router;
use bazaar_core::pagination::{Page, SortDirection};
use bazaar_core::ValidationError;
use bazaar_core::reviews::{
    Review, ReviewDraft, ReviewEdit, ReviewEvent, ReviewFilter, ReviewSort, ReviewSortField,
};
use bazaar_db::ReviewThread;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::CATALOG_PAGE_SIZE;
use crate::auth::{AdminUser, AuthUser, Tenant};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, PageParams};
use crate::AppState;

/// Upper bound on ids accepted by one batch delete.
const MAX_BATCH_DELETE: usize = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/products/{id}/reviews",
            get(list_reviews).post(create_review),
        )
        .route(
            "/api/reviews/{id}",
            get(get_thread).put(update_review).delete(delete_review),
        )
        .route("/api/reviews/{id}/replies", get(list_replies))
        .route("/api/reviews/{id}/like", post(like).delete(unlike))
        .route("/api/admin/reviews", delete(batch_delete))
}

fn log_event(tenant: &str, event: &ReviewEvent) {
    info!(tenant = %tenant, event = event.name(), detail = ?event, "Review event");
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortDirection>,
    pub rating: Option<i64>,
    pub has_images: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

async fn list_reviews(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(product_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ReviewQuery>,
) -> ApiResult<ApiJson<Page<Review>>> {
    let sort = ReviewSort {
        field: match query.sort_field.as_deref() {
            Some(raw) => raw.parse::<ReviewSortField>()?,
            None => ReviewSortField::default(),
        },
        direction: query.sort_order.unwrap_or_default(),
    };
    let filter = ReviewFilter {
        rating: query.rating,
        has_images: query.has_images,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let page = PageParams {
        page: query.page,
        page_size: query.page_size,
    }
    .request_with_default(CATALOG_PAGE_SIZE);

    let reviews = state
        .db
        .reviews()
        .list_for_product(&tenant.0, &product_id, &filter, sort, page)
        .await?;
    Ok(ApiJson(reviews))
}

/// Posts a review, or a reply when `parent_id` is set.
async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<String>,
    ApiJson(draft): ApiJson<ReviewDraft>,
) -> ApiResult<(StatusCode, ApiJson<Review>)> {
    let (review, event) = state
        .db
        .reviews()
        .create(user.tenant(), &product_id, user.id(), &draft)
        .await?;
    log_event(user.tenant(), &event);
    Ok((StatusCode::CREATED, ApiJson(review)))
}

async fn get_thread(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<ReviewThread>> {
    Ok(ApiJson(state.db.reviews().thread(&tenant.0, &id).await?))
}

async fn list_replies(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(id): ApiPath<String>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<ApiJson<Page<Review>>> {
    let replies = state
        .db
        .reviews()
        .replies(&tenant.0, &id, page.request_with_default(CATALOG_PAGE_SIZE))
        .await?;
    Ok(ApiJson(replies))
}

async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(edit): ApiJson<ReviewEdit>,
) -> ApiResult<ApiJson<Review>> {
    let (review, event) = state
        .db
        .reviews()
        .update(user.tenant(), &id, user.id(), &edit)
        .await?;
    log_event(user.tenant(), &event);
    Ok(ApiJson(review))
}

/// Authors delete their own; admins delete any.
async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    let event = state
        .db
        .reviews()
        .delete(user.tenant(), &id, user.id(), user.is_admin())
        .await?;
    log_event(user.tenant(), &event);
    Ok(StatusCode::NO_CONTENT)
}

/// Like state after a like/unlike.
#[derive(Debug, Serialize)]
pub struct LikeState {
    pub review_id: String,
    pub liked: bool,
    pub like_count: i64,
}

async fn like(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<LikeState>> {
    let reviews = state.db.reviews();
    let event = reviews.like(user.tenant(), &id, user.id()).await?;
    log_event(user.tenant(), &event);

    let review = reviews.get(user.tenant(), &id).await?;
    Ok(ApiJson(LikeState {
        review_id: review.id,
        liked: true,
        like_count: review.like_count,
    }))
}

async fn unlike(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<LikeState>> {
    let reviews = state.db.reviews();
    let event = reviews.unlike(user.tenant(), &id, user.id()).await?;
    log_event(user.tenant(), &event);

    let review = reviews.get(user.tenant(), &id).await?;
    Ok(ApiJson(LikeState {
        review_id: review.id,
        liked: false,
        like_count: review.like_count,
    }))
}

#[derive(Debug, Deserialize)]
pub struct BatchDelete {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchDeleted {
    pub deleted: usize,
}

async fn batch_delete(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiJson(body): ApiJson<BatchDelete>,
) -> ApiResult<ApiJson<BatchDeleted>> {
    if body.ids.is_empty() {
        return Err(ValidationError::required("ids").into());
    }
    if body.ids.len() > MAX_BATCH_DELETE {
        return Err(ValidationError::TooMany {
            field: "ids".to_string(),
            max: MAX_BATCH_DELETE,
        }
        .into());
    }

    let events = state.db.reviews().batch_delete(admin.tenant(), &body.ids).await?;
    for event in &events {
        log_event(admin.tenant(), event);
    }

    Ok(ApiJson(BatchDeleted {
        deleted: events.len(),
    }))
}
