//! # Routes
//!
//! One module per area. Each exposes `routes()`; [`router`] merges them.
//!
//! ```text
//! /health                         health
//! /api/categories, /api/products  catalog      (+ /api/admin/categories|products)
//! /api/products/{id}/reviews      reviews      (+ /api/reviews/..., /api/admin/reviews)
//! /api/cart                       cart
//! /api/checkout, /api/orders      orders       (+ /api/admin/orders)
//! /api/me                         account
//! /api/admin/users, /dashboard    admin
//! ```

pub mod account;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod orders;
pub mod reviews;

use axum::Router;

use crate::AppState;

/// Page size for the product catalog and review lists.
pub const CATALOG_PAGE_SIZE: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(catalog::routes())
        .merge(reviews::routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .merge(account::routes())
        .merge(admin::routes())
}
