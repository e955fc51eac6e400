//! # Orders
//!
//! The order lifecycle and the pure parts of checkout.
//!
//! ## Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌─────────┐  pay   ┌──────┐  ship   ┌─────────┐ deliver ┌───────────┐│
//! │   │ Pending │──────►│ Paid │───────►│ Shipped │────────►│ Delivered ││
//! │   └────┬────┘        └──┬───┘         └─────────┘         └───────────┘│
//! │        │ cancel         │ cancel                                        │
//! │        ▼                ▼                                               │
//! │   ┌──────────────────────────┐                                         │
//! │   │        Cancelled         │   Delivered and Cancelled are terminal  │
//! │   └──────────────────────────┘                                         │
//! │                                                                         │
//! │   Customers may cancel only while Pending.                              │
//! │   Adding a tracking number to a Paid order ships it.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::OrderStatus;

// =============================================================================
// Transitions
// =============================================================================

impl OrderStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Staying in the same status is not a transition.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Shipped)
                | (Paid, Cancelled)
                | (Shipped, Delivered)
        )
    }

    /// No further changes are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Customers may cancel their own order only before payment.
    pub fn is_cancellable_by_customer(&self) -> bool {
        *self == OrderStatus::Pending
    }

    /// Whether the order's revenue counts toward analytics.
    pub fn counts_as_revenue(&self) -> bool {
        *self != OrderStatus::Cancelled
    }
}

/// Validates a status change.
///
/// ## Returns
/// * `Ok(next)` if the lifecycle allows it
/// * `Err(InvalidOrderTransition)` otherwise
///
/// ## Example
/// ```rust
/// use bazaar_core::orders::transition;
/// use bazaar_core::OrderStatus;
///
/// assert!(transition(OrderStatus::Pending, OrderStatus::Paid).is_ok());
/// assert!(transition(OrderStatus::Pending, OrderStatus::Shipped).is_err());
/// ```
pub fn transition(current: OrderStatus, next: OrderStatus) -> CoreResult<OrderStatus> {
    if current.can_transition_to(next) {
        Ok(next)
    } else {
        Err(CoreError::InvalidOrderTransition {
            from: current,
            to: next,
        })
    }
}

/// Status an order should have after a tracking number is attached.
///
/// Paid orders move to Shipped; every other status is left alone.
pub fn status_after_tracking(current: OrderStatus) -> OrderStatus {
    match current {
        OrderStatus::Paid => OrderStatus::Shipped,
        other => other,
    }
}

/// History comment used when the caller does not supply one.
pub fn default_history_comment(status: OrderStatus) -> String {
    format!("Order status changed to {status}")
}

// =============================================================================
// Checkout Draft
// =============================================================================

/// A line about to be written as an `OrderItem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineDraft {
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

/// Everything needed to insert an order, computed from a cart.
///
/// Prices are frozen here: later catalog changes never alter an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub user_id: String,
    pub lines: Vec<OrderLineDraft>,
    pub total_cents: i64,
    pub item_count: i64,
}

impl OrderDraft {
    /// Builds a draft from a freshly loaded cart.
    ///
    /// ## Errors
    /// - `EmptyCart` if there is nothing to buy
    /// - `InsufficientStock` / `ProductUnavailable` from [`Cart::ensure_available`]
    pub fn from_cart(cart: &Cart) -> CoreResult<Self> {
        cart.ensure_available()?;

        let lines: Vec<OrderLineDraft> = cart
            .lines
            .iter()
            .map(|line| OrderLineDraft {
                product_id: line.product_id.clone(),
                name_snapshot: line.name.clone(),
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                line_total_cents: line.line_total().cents(),
            })
            .collect();

        let total: Money = lines
            .iter()
            .map(|l| Money::from_cents(l.line_total_cents))
            .sum();

        Ok(OrderDraft {
            user_id: cart.user_id.clone(),
            item_count: cart.total_quantity(),
            total_cents: total.cents(),
            lines,
        })
    }
}

// =============================================================================
// Back-office Listing
// =============================================================================

/// Sort order for the back-office order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    #[default]
    Newest,
    Oldest,
    TotalAsc,
    TotalDesc,
}

impl OrderSort {
    /// `ORDER BY` clause. Ties break on id so pages are stable.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            OrderSort::Newest => "created_at DESC, id DESC",
            OrderSort::Oldest => "created_at ASC, id ASC",
            OrderSort::TotalAsc => "total_cents ASC, id ASC",
            OrderSort::TotalDesc => "total_cents DESC, id DESC",
        }
    }
}

impl FromStr for OrderSort {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(OrderSort::Newest),
            "oldest" => Ok(OrderSort::Oldest),
            "total_asc" => Ok(OrderSort::TotalAsc),
            "total_desc" => Ok(OrderSort::TotalDesc),
            _ => Err(ValidationError::NotAllowed {
                field: "sort_by".to_string(),
                allowed: ["newest", "oldest", "total_asc", "total_desc"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// Filters for the back-office order list. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<String>,
    /// Case-insensitive substring of the order id or tracking number.
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub min_total_cents: Option<i64>,
    pub max_total_cents: Option<i64>,
}

impl OrderFilter {
    /// Rejects inverted ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(min), Some(max)) = (self.min_total_cents, self.max_total_cents) {
            if min > max {
                return Err(ValidationError::invalid_format(
                    "min_total",
                    "must not exceed max_total",
                ));
            }
        }

        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ValidationError::invalid_format(
                    "date_from",
                    "must not be after date_to",
                ));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
