//! # bazaar-core: Pure Business Logic for Bazaar
//!
//! This crate is the **heart** of the Bazaar storefront. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Storefront + Back-office frontends                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bazaar-api (axum)                            │   │
//! │  │    /api/products, /api/cart, /api/checkout, /api/admin/...      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌────────┐ ┌────────┐ ┌────────┐ ┌─────────┐ ┌────────────┐  │   │
//! │  │  │ types  │ │ money  │ │  cart  │ │ orders  │ │  reviews   │  │   │
//! │  │  └────────┘ └────────┘ └────────┘ └─────────┘ └────────────┘  │   │
//! │  │  ┌────────────┐ ┌────────────┐ ┌────────┐                      │   │
//! │  │  │ validation │ │ pagination │ │ stats  │                      │   │
//! │  │  └────────────┘ └────────────┘ └────────┘                      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bazaar-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Order, User, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart aggregate and its rules
//! - [`catalog`] - Product and category payloads, storefront search
//! - [`orders`] - Order status machine, checkout drafts, list filters
//! - [`reviews`] - Reviews, replies, likes and their events
//! - [`pagination`] - Page requests and metadata
//! - [`stats`] - Dashboard analytics
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bazaar_core::orders::transition;
//! use bazaar_core::{Money, OrderStatus};
//!
//! let price = Money::from_cents(1099);
//! assert_eq!((price * 2).to_string(), "$21.98");
//!
//! assert!(transition(OrderStatus::Paid, OrderStatus::Shipped).is_ok());
//! assert!(transition(OrderStatus::Delivered, OrderStatus::Paid).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod orders;
pub mod pagination;
pub mod reviews;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use bazaar_core::Money` instead of
// `use bazaar_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used when a request names none (single-store deployments).
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum distinct products in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps checkout transactions small.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest catalog price, in cents ($1,000,000).
///
/// ## Business Reason
/// Keeps `price × MAX_ITEM_QUANTITY × MAX_CART_ITEMS` far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Highest stock level a product may hold, and the largest single adjustment.
pub const MAX_STOCK: i64 = 1_000_000;

/// Largest page any list endpoint will return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Products at or below this stock count show up as "low stock".
pub const LOW_STOCK_THRESHOLD: i64 = 5;
