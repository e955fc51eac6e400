//! # Order Repository
//!
//! Checkout and the order lifecycle.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    POST /api/checkout                                   │
//! │                                                                         │
//! │  (outside the transaction)                                             │
//! │  load cart ──► OrderDraft::from_cart  (empty cart, stock, active)      │
//! │  resolve shipping address (given id, else the default)                 │
//! │       │                                                                 │
//! │  BEGIN ▼                                                                │
//! │  for each line:                                                         │
//! │     UPDATE products SET stock = stock - q                              │
//! │      WHERE id = ? AND is_active = 1 AND stock >= q                     │
//! │     0 rows? ──► ROLLBACK, report InsufficientStock/ProductUnavailable  │
//! │  INSERT orders, order_items (price snapshots), order_history           │
//! │  DELETE cart_items                                                     │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Two shoppers racing for the last unit: both drafts pass, only one guarded
//! UPDATE matches, the other checkout rolls back with nothing written.
//!
//! ## Status Changes
//! Every change is checked against the state machine in
//! [`bazaar_core::orders`], written with `WHERE status = <status we read>`
//! so a concurrent change is detected as a conflict, and recorded in
//! `order_history`. Cancelling returns the units to stock.

use bazaar_core::orders::{
    default_history_comment, status_after_tracking, transition, OrderDraft, OrderFilter, OrderSort,
};
use bazaar_core::pagination::{Page, PageRequest};
use bazaar_core::stats::{OrderSnapshot, OrderStats, TopProduct};
use bazaar_core::validation::validate_tracking_number;
use bazaar_core::{
    CoreError, Order, OrderHistoryEntry, OrderItem, OrderStatus, ShippingAddress, ValidationError,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::{like_pattern, new_id};
use crate::error::{DbError, DbResult};
use crate::repository::address::AddressRepository;
use crate::repository::cart::CartRepository;
use crate::repository::product::ProductRepository;

const ORDER_COLUMNS: &str = r#"
    id, tenant_id, user_id, status, total_cents, item_count,
    shipping_address_id, ship_to, tracking_number, estimated_delivery,
    notes, payment_intent_id, created_at, updated_at
"#;

const LIST_WHERE: &str = r#"
    WHERE tenant_id = ?1
      AND (?2 IS NULL OR status = ?2)
      AND (?3 IS NULL OR user_id = ?3)
      AND (?4 IS NULL OR id LIKE ?4 ESCAPE '\' OR tracking_number LIKE ?4 ESCAPE '\')
      AND (?5 IS NULL OR created_at >= ?5)
      AND (?6 IS NULL OR created_at <= ?6)
      AND (?7 IS NULL OR total_cents >= ?7)
      AND (?8 IS NULL OR total_cents <= ?8)
"#;

/// An order with its lines and audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderHistoryEntry>,
}

/// Repository for order operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turns the user's cart into a pending order.
    ///
    /// ## Arguments
    /// * `shipping_address_id` - One of the user's addresses; `None` uses the default
    ///
    /// ## Returns
    /// * `Ok(OrderDetail)` - The new order; the cart is now empty
    /// * `Err(CoreError::EmptyCart)` - Nothing to buy
    /// * `Err(CoreError::InsufficientStock)` - A line no longer fits the stock
    /// * `Err(CoreError::ProductUnavailable)` - A product was taken off sale
    /// * `Err(ValidationError::Required)` - No address given and no default saved
    pub async fn checkout(
        &self,
        tenant_id: &str,
        user_id: &str,
        shipping_address_id: Option<&str>,
    ) -> DbResult<OrderDetail> {
        let cart = CartRepository::new(self.pool.clone())
            .load(tenant_id, user_id)
            .await?;
        let draft = OrderDraft::from_cart(&cart)?;
        let address = self.resolve_address(user_id, shipping_address_id).await?;

        debug!(
            user = %user_id,
            lines = draft.lines.len(),
            total_cents = draft.total_cents,
            "Starting checkout"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for line in &draft.lines {
            let reserved = sqlx::query(
                r#"
                UPDATE products SET stock = stock - ?3, updated_at = ?4
                WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1 AND stock >= ?3
                "#,
            )
            .bind(&line.product_id)
            .bind(tenant_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if reserved.rows_affected() == 0 {
                tx.rollback().await?;
                warn!(product = %line.product_id, "Checkout lost a stock race");
                return Err(self.stock_error(tenant_id, &line.product_id, line.quantity).await);
            }
        }

        let order = Order {
            id: new_id(),
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            status: OrderStatus::Pending,
            total_cents: draft.total_cents,
            item_count: draft.item_count,
            shipping_address_id: Some(address.id.clone()),
            ship_to: Some(address.label()),
            tracking_number: None,
            estimated_delivery: None,
            notes: None,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, tenant_id, user_id, status, total_cents, item_count,
                shipping_address_id, ship_to, tracking_number, estimated_delivery,
                notes, payment_intent_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, NULL, NULL, NULL, ?9, ?9)
            "#,
        )
        .bind(&order.id)
        .bind(&order.tenant_id)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(order.total_cents)
        .bind(order.item_count)
        .bind(&order.shipping_address_id)
        .bind(&order.ship_to)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in draft.lines {
            let item = OrderItem {
                id: new_id(),
                order_id: order.id.clone(),
                product_id: line.product_id,
                name_snapshot: line.name_snapshot,
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                line_total_cents: line.line_total_cents,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, name_snapshot,
                    unit_price_cents, quantity, line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.line_total_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        let placed = insert_history(
            &mut *tx,
            &order.id,
            OrderStatus::Pending,
            "Order placed",
            Some(user_id),
        )
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = ?1 AND tenant_id = ?2")
            .bind(user_id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            order = %order.id,
            user = %user_id,
            total = %order.total(),
            items = order.item_count,
            "Order placed"
        );

        Ok(OrderDetail {
            order,
            items,
            history: vec![placed],
        })
    }

    async fn resolve_address(
        &self,
        user_id: &str,
        shipping_address_id: Option<&str>,
    ) -> DbResult<ShippingAddress> {
        let addresses = AddressRepository::new(self.pool.clone());
        match shipping_address_id {
            Some(id) => addresses.get(user_id, id).await,
            None => addresses
                .default_for(user_id)
                .await?
                .ok_or_else(|| DbError::from(ValidationError::required("shipping_address_id"))),
        }
    }

    /// Explains why a guarded stock decrement matched no row.
    async fn stock_error(&self, tenant_id: &str, product_id: &str, requested: i64) -> DbError {
        match ProductRepository::new(self.pool.clone())
            .get(tenant_id, product_id)
            .await
        {
            Ok(product) if !product.is_active => {
                CoreError::ProductUnavailable(product_id.to_string()).into()
            }
            Ok(product) => CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested,
            }
            .into(),
            Err(err) => err,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A customer's own orders, newest first.
    pub async fn list_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        page: PageRequest,
    ) -> DbResult<Page<Order>> {
        let filter = OrderFilter {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        };
        self.list(tenant_id, &filter, OrderSort::Newest, page).await
    }

    /// Back-office order list.
    pub async fn list(
        &self,
        tenant_id: &str,
        filter: &OrderFilter,
        sort: OrderSort,
        page: PageRequest,
    ) -> DbResult<Page<Order>> {
        filter.validate()?;
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM orders {LIST_WHERE}"))
            .bind(tenant_id)
            .bind(filter.status)
            .bind(&filter.user_id)
            .bind(&search)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .bind(filter.min_total_cents)
            .bind(filter.max_total_cents)
            .fetch_one(&self.pool)
            .await?;

        if total == 0 {
            return Ok(Page::empty(page));
        }

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders {LIST_WHERE} ORDER BY {} LIMIT ?9 OFFSET ?10",
            sort.as_sql()
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(tenant_id)
            .bind(filter.status)
            .bind(&filter.user_id)
            .bind(&search)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .bind(filter.min_total_cents)
            .bind(filter.max_total_cents)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(orders, total, page))
    }

    /// Full order for the back office.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<OrderDetail> {
        let order = self.get_order(tenant_id, id).await?;
        self.detail(order).await
    }

    /// Full order for its owner. Other users' orders are reported as missing.
    pub async fn get_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        id: &str,
    ) -> DbResult<OrderDetail> {
        let order = self.get_order(tenant_id, id).await?;
        if order.user_id != user_id {
            return Err(DbError::not_found("Order", id));
        }
        self.detail(order).await
    }

    async fn get_order(&self, tenant_id: &str, id: &str) -> DbResult<Order> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 AND tenant_id = ?2");
        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    async fn detail(&self, order: Order) -> DbResult<OrderDetail> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, name_snapshot,
                   unit_price_cents, quantity, line_total_cents, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(&order.id)
        .fetch_all(&self.pool)
        .await?;

        let history = sqlx::query_as::<_, OrderHistoryEntry>(
            r#"
            SELECT id, order_id, status, comment, created_by, created_at
            FROM order_history
            WHERE order_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(&order.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderDetail {
            order,
            items,
            history,
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Moves an order to `next` (back office).
    ///
    /// ## Returns
    /// * `Err(CoreError::InvalidOrderTransition)` - Not allowed from the current status
    /// * `Err(DbError::Conflict)` - Someone else changed the order meanwhile
    pub async fn update_status(
        &self,
        tenant_id: &str,
        id: &str,
        next: OrderStatus,
        comment: Option<&str>,
        actor_id: &str,
    ) -> DbResult<Order> {
        let order = self.get_order(tenant_id, id).await?;
        transition(order.status, next)?;

        let comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_history_comment(next));

        self.apply_status(&order, next, &comment, actor_id).await
    }

    /// Cancels a pending order on behalf of its owner.
    pub async fn cancel_by_customer(
        &self,
        tenant_id: &str,
        user_id: &str,
        id: &str,
    ) -> DbResult<Order> {
        let order = self.get_order(tenant_id, id).await?;
        if order.user_id != user_id {
            return Err(DbError::not_found("Order", id));
        }
        if !order.status.is_cancellable_by_customer() {
            return Err(CoreError::InvalidOrderTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            }
            .into());
        }

        self.apply_status(&order, OrderStatus::Cancelled, "Cancelled by customer", user_id)
            .await
    }

    async fn apply_status(
        &self,
        order: &Order,
        next: OrderStatus,
        comment: &str,
        actor_id: &str,
    ) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE orders SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND tenant_id = ?2 AND status = ?5
            "#,
        )
        .bind(&order.id)
        .bind(&order.tenant_id)
        .bind(next)
        .bind(Utc::now())
        .bind(order.status)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "order {} changed while updating it, reload and retry",
                order.id
            )));
        }

        if next == OrderStatus::Cancelled {
            restock(&mut *tx, &order.id).await?;
        }

        insert_history(&mut *tx, &order.id, next, comment, Some(actor_id)).await?;

        tx.commit().await?;

        info!(order = %order.id, from = %order.status, to = %next, actor = %actor_id, "Order status changed");
        self.get_order(&order.tenant_id, &order.id).await
    }

    /// Records a tracking number. A paid order moves to shipped.
    ///
    /// ## Returns
    /// * `Err(CoreError::InvalidOrderTransition)` - Pending or cancelled orders cannot ship
    pub async fn update_tracking(
        &self,
        tenant_id: &str,
        id: &str,
        tracking_number: &str,
        estimated_delivery: Option<DateTime<Utc>>,
        actor_id: &str,
    ) -> DbResult<Order> {
        validate_tracking_number(tracking_number)?;
        let tracking_number = tracking_number.trim();

        let order = self.get_order(tenant_id, id).await?;
        if matches!(order.status, OrderStatus::Pending | OrderStatus::Cancelled) {
            return Err(CoreError::InvalidOrderTransition {
                from: order.status,
                to: OrderStatus::Shipped,
            }
            .into());
        }
        let next = status_after_tracking(order.status);

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE orders SET
                tracking_number = ?3,
                estimated_delivery = ?4,
                status = ?5,
                updated_at = ?6
            WHERE id = ?1 AND tenant_id = ?2 AND status = ?7
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(tracking_number)
        .bind(estimated_delivery)
        .bind(next)
        .bind(Utc::now())
        .bind(order.status)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "order {id} changed while updating it, reload and retry"
            )));
        }

        if next != order.status {
            let comment = format!("Order shipped, tracking number {tracking_number}");
            insert_history(&mut *tx, id, next, &comment, Some(actor_id)).await?;
        }

        tx.commit().await?;

        info!(order = %id, tracking = %tracking_number, status = %next, "Tracking updated");
        self.get_order(tenant_id, id).await
    }

    /// Replaces the internal notes.
    pub async fn update_notes(
        &self,
        tenant_id: &str,
        id: &str,
        notes: Option<&str>,
    ) -> DbResult<Order> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());

        let result = sqlx::query(
            "UPDATE orders SET notes = ?3, updated_at = ?4 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        self.get_order(tenant_id, id).await
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    /// Order totals, status counts and monthly buckets.
    pub async fn stats(&self, tenant_id: &str) -> DbResult<OrderStats> {
        let snapshots = sqlx::query_as::<_, OrderSnapshot>(
            "SELECT status, total_cents, created_at FROM orders WHERE tenant_id = ?1",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderStats::from_orders(&snapshots))
    }

    /// The most recent orders.
    pub async fn recent(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE tenant_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(tenant_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    /// Best sellers by units, cancelled orders excluded.
    pub async fn top_products(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<TopProduct>> {
        let top = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                oi.product_id,
                p.name,
                SUM(oi.quantity) AS units_sold,
                SUM(oi.line_total_cents) AS revenue_cents
            FROM order_items oi
            INNER JOIN orders o ON o.id = oi.order_id
            INNER JOIN products p ON p.id = oi.product_id
            WHERE o.tenant_id = ?1 AND o.status != 'cancelled'
            GROUP BY oi.product_id, p.name
            ORDER BY units_sold DESC, revenue_cents DESC, oi.product_id ASC
            LIMIT ?2
            "#,
        )
        .bind(tenant_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(top)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn insert_history(
    conn: &mut SqliteConnection,
    order_id: &str,
    status: OrderStatus,
    comment: &str,
    created_by: Option<&str>,
) -> DbResult<OrderHistoryEntry> {
    let entry = OrderHistoryEntry {
        id: new_id(),
        order_id: order_id.to_string(),
        status,
        comment: Some(comment.to_string()),
        created_by: created_by.map(str::to_string),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO order_history (id, order_id, status, comment, created_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.order_id)
    .bind(entry.status)
    .bind(&entry.comment)
    .bind(&entry.created_by)
    .bind(entry.created_at)
    .execute(conn)
    .await?;

    Ok(entry)
}

/// Returns an order's units to stock.
async fn restock(conn: &mut SqliteConnection, order_id: &str) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            stock = stock + (
                SELECT COALESCE(SUM(oi.quantity), 0) FROM order_items oi
                WHERE oi.order_id = ?1 AND oi.product_id = products.id
            ),
            updated_at = ?2
        WHERE id IN (SELECT product_id FROM order_items WHERE order_id = ?1)
        "#,
    )
    .bind(order_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    debug!(order = %order_id, products = result.rows_affected(), "Order restocked");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
