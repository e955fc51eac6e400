//! # Stats
//!
//! Back-office analytics computed from plain rows.
//!
//! The database layer fetches lightweight [`OrderSnapshot`]s and counts;
//! the arithmetic lives here so it can be tested without SQLite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Order, OrderStatus};

// =============================================================================
// Orders
// =============================================================================

/// The three columns order analytics need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderSnapshot {
    pub status: OrderStatus,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Orders and revenue for one calendar month (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyBucket {
    /// `YYYY-MM`
    pub month: String,
    pub orders: i64,
    pub revenue_cents: i64,
}

/// Order analytics.
///
/// ## Revenue
/// Cancelled orders are counted in `total_orders` and `status_counts` but
/// contribute nothing to revenue or the average order value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_revenue_cents: i64,
    pub avg_order_value_cents: i64,
    /// One entry per status, in lifecycle order, zero-filled.
    pub status_counts: Vec<StatusCount>,
    /// Oldest month first. Months with no orders are omitted.
    pub monthly: Vec<MonthlyBucket>,
}

impl OrderStats {
    pub fn from_orders(orders: &[OrderSnapshot]) -> Self {
        let mut counts: BTreeMap<OrderStatus, i64> =
            OrderStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut months: BTreeMap<String, (i64, Money)> = BTreeMap::new();
        let mut revenue = Money::zero();
        let mut revenue_orders = 0_i64;

        for order in orders {
            *counts.entry(order.status).or_insert(0) += 1;

            let bucket = months
                .entry(order.created_at.format("%Y-%m").to_string())
                .or_insert((0, Money::zero()));
            bucket.0 += 1;

            if order.status.counts_as_revenue() {
                let total = Money::from_cents(order.total_cents);
                revenue += total;
                revenue_orders += 1;
                bucket.1 += total;
            }
        }

        OrderStats {
            total_orders: orders.len() as i64,
            total_revenue_cents: revenue.cents(),
            avg_order_value_cents: Money::average(revenue, revenue_orders).cents(),
            status_counts: counts
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            monthly: months
                .into_iter()
                .map(|(month, (orders, revenue))| MonthlyBucket {
                    month,
                    orders,
                    revenue_cents: revenue.cents(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Users / Products
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub admins: i64,
    pub customers: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductStats {
    /// Active products only.
    pub total: i64,
    pub out_of_stock: i64,
    pub featured: i64,
    /// Active products with stock at or below the low-stock threshold.
    pub low_stock: i64,
}

/// A best-selling product by units sold (cancelled orders excluded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

// =============================================================================
// Dashboard
// =============================================================================

/// Everything the back-office landing page shows.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub orders: OrderStats,
    pub users: UserStats,
    pub products: ProductStats,
    pub recent_orders: Vec<Order>,
    pub top_products: Vec<TopProduct>,
}

// =============================================================================
// Unit Tests
// =============================================================================
