//! Categories and products: storefront reads plus back-office CRUD.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::Router;
use bazaar_core::catalog::{CategoryInput, ProductFilter, ProductInput, ProductSort, ProductUpdate};
use bazaar_core::pagination::Page;
use bazaar_core::{Category, Product};
use bazaar_db::CategorySummary;
use serde::Deserialize;
use tracing::info;

use super::CATALOG_PAGE_SIZE;
use crate::auth::{AdminUser, Tenant};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, PageParams};
use crate::AppState;

const FEATURED_DEFAULT: u32 = 8;
const FEATURED_MAX: u32 = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/categories/{id}", get(get_category))
        .route("/api/admin/categories", post(create_category))
        .route(
            "/api/admin/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route("/api/products", get(search_products))
        .route("/api/products/featured", get(featured_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/admin/products", get(admin_products).post(create_product))
        .route(
            "/api/admin/products/{id}",
            put(update_product).delete(delete_product),
        )
        .route("/api/admin/products/{id}/stock", patch(adjust_stock))
}

// =============================================================================
// Categories
// =============================================================================

async fn list_categories(
    State(state): State<AppState>,
    tenant: Tenant,
) -> ApiResult<ApiJson<Vec<CategorySummary>>> {
    Ok(ApiJson(state.db.categories().list(&tenant.0).await?))
}

async fn get_category(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<Category>> {
    Ok(ApiJson(state.db.categories().get(&tenant.0, &id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<(StatusCode, ApiJson<Category>)> {
    let category = state.db.categories().insert(admin.tenant(), &input).await?;
    info!(admin = %admin.id(), category = %category.id, "Category created");
    Ok((StatusCode::CREATED, ApiJson(category)))
}

async fn update_category(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<ApiJson<Category>> {
    Ok(ApiJson(
        state.db.categories().update(admin.tenant(), &id, &input).await?,
    ))
}

async fn delete_category(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.db.categories().delete(admin.tenant(), &id).await?;
    info!(admin = %admin.id(), category = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

/// Storefront search parameters. Prices are in cents.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[serde(default)]
    pub featured: bool,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ProductQuery {
    fn into_parts(self, include_inactive: bool) -> ApiResult<(ProductFilter, ProductSort, PageParams)> {
        let sort = match self.sort.as_deref() {
            Some(raw) => raw.parse::<ProductSort>()?,
            None => ProductSort::default(),
        };
        let filter = ProductFilter {
            keyword: self.keyword,
            category_id: self.category.filter(|c| !c.trim().is_empty()),
            min_price_cents: self.min_price,
            max_price_cents: self.max_price,
            featured_only: self.featured,
            include_inactive,
        };
        let page = PageParams {
            page: self.page,
            page_size: self.page_size,
        };
        Ok((filter, sort, page))
    }
}

async fn search_products(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<ApiJson<Page<Product>>> {
    let (filter, sort, page) = query.into_parts(false)?;
    let products = state
        .db
        .products()
        .search(&tenant.0, &filter, sort, page.request_with_default(CATALOG_PAGE_SIZE))
        .await?;
    Ok(ApiJson(products))
}

/// Back-office listing: same filters, deactivated products included.
async fn admin_products(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<ApiJson<Page<Product>>> {
    let (filter, sort, page) = query.into_parts(true)?;
    let products = state
        .db
        .products()
        .search(admin.tenant(), &filter, sort, page.request())
        .await?;
    Ok(ApiJson(products))
}

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<u32>,
}

async fn featured_products(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiQuery(query): ApiQuery<FeaturedQuery>,
) -> ApiResult<ApiJson<Vec<Product>>> {
    let limit = query.limit.unwrap_or(FEATURED_DEFAULT).clamp(1, FEATURED_MAX);
    Ok(ApiJson(state.db.products().featured(&tenant.0, limit).await?))
}

/// Deactivated products are hidden from the storefront.
async fn get_product(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<Product>> {
    let product = state.db.products().get(&tenant.0, &id).await?;
    if !product.is_active {
        return Err(ApiError::NotFound(format!("Product not found: {id}")));
    }
    Ok(ApiJson(product))
}

async fn create_product(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<(StatusCode, ApiJson<Product>)> {
    let product = state.db.products().insert(admin.tenant(), &input).await?;
    info!(admin = %admin.id(), product = %product.id, "Product created");
    Ok((StatusCode::CREATED, ApiJson(product)))
}

async fn update_product(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> ApiResult<ApiJson<Product>> {
    Ok(ApiJson(
        state.db.products().update(admin.tenant(), &id, &update).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

async fn adjust_stock(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<StockAdjustment>,
) -> ApiResult<ApiJson<Product>> {
    let product = state
        .db
        .products()
        .adjust_stock(admin.tenant(), &id, body.delta)
        .await?;
    info!(admin = %admin.id(), product = %id, delta = body.delta, stock = product.stock, "Stock adjusted");
    Ok(ApiJson(product))
}

async fn delete_product(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.db.products().soft_delete(admin.tenant(), &id).await?;
    info!(admin = %admin.id(), product = %id, "Product deactivated");
    Ok(StatusCode::NO_CONTENT)
}
