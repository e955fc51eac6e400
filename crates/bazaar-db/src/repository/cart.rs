//! # Cart Repository
//!
//! Persists per-user carts.
//!
//! ## Flow
//! ```text
//!   load()  ──► Cart (lines joined with live product price/stock)
//!     │
//!     ▼
//!   bazaar_core::cart rules (quantity limits, stock, active flag)
//!     │
//!     ▼
//!   upsert / delete the single affected row
//! ```
//! Cart rows only hold `(user, product, quantity)`. Prices are read live and
//! frozen at checkout.

use bazaar_core::cart::{Cart, CartLine};
use bazaar_core::CoreError;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::product::ProductRepository;

/// Repository for cart operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Loads a user's cart in the order items were added.
    pub async fn load(&self, tenant_id: &str, user_id: &str) -> DbResult<Cart> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT
                ci.product_id,
                p.name,
                p.price_cents AS unit_price_cents,
                ci.quantity,
                p.image_url,
                p.stock,
                p.is_active
            FROM cart_items ci
            INNER JOIN products p ON p.id = ci.product_id
            WHERE ci.user_id = ?1 AND ci.tenant_id = ?2
            ORDER BY ci.added_at ASC, ci.product_id ASC
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Cart::from_lines(user_id, lines))
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    ///
    /// ## Returns
    /// * `Ok(Cart)` - The updated cart
    /// * `Err(DbError::NotFound)` - No such product in this tenant
    /// * `Err(CoreError::..)` - Inactive product, stock or size limits
    pub async fn add(
        &self,
        tenant_id: &str,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<Cart> {
        let product = ProductRepository::new(self.pool.clone())
            .get(tenant_id, product_id)
            .await?;

        let mut cart = self.load(tenant_id, user_id).await?;
        let new_quantity = cart.add(&product, quantity)?.quantity;

        self.write_line(tenant_id, user_id, product_id, new_quantity).await?;

        debug!(user = %user_id, product = %product_id, quantity = new_quantity, "Cart line added");
        Ok(cart)
    }

    /// Sets a line's quantity. Zero removes the line.
    pub async fn set_quantity(
        &self,
        tenant_id: &str,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<Cart> {
        let mut cart = self.load(tenant_id, user_id).await?;

        match cart.set_quantity(product_id, quantity)? {
            Some(line) => {
                let quantity = line.quantity;
                self.write_line(tenant_id, user_id, product_id, quantity).await?;
            }
            None => {
                self.delete_line(user_id, product_id).await?;
            }
        }

        debug!(user = %user_id, product = %product_id, quantity, "Cart line set");
        Ok(cart)
    }

    /// Removes a line.
    ///
    /// ## Returns
    /// * `Err(CoreError::NotInCart)` - The product is not in the cart
    pub async fn remove(&self, tenant_id: &str, user_id: &str, product_id: &str) -> DbResult<Cart> {
        let deleted = self.delete_line(user_id, product_id).await?;
        if !deleted {
            return Err(CoreError::NotInCart(product_id.to_string()).into());
        }
        self.load(tenant_id, user_id).await
    }

    /// Empties the cart.
    pub async fn clear(&self, tenant_id: &str, user_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?1 AND tenant_id = ?2")
            .bind(user_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_line(
        &self,
        tenant_id: &str,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO cart_items (tenant_id, user_id, product_id, quantity, added_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = excluded.quantity, updated_at = excluded.updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_line(&self, user_id: &str, product_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::{self, TENANT};

    #[tokio::test]
    async fn test_add_merges_lines_and_persists() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let shirt = test_support::product(&db, "Linen Shirt", 4999, 10).await;

        db.carts().add(TENANT, &user.id, &shirt.id, 2).await.unwrap();
        let cart = db.carts().add(TENANT, &user.id, &shirt.id, 3).await.unwrap();
        assert_eq!(cart.line(&shirt.id).unwrap().quantity, 5);

        let reloaded = db.carts().load(TENANT, &user.id).await.unwrap();
        assert_eq!(reloaded.item_count(), 1);
        assert_eq!(reloaded.subtotal().cents(), 5 * 4999);
    }

    #[tokio::test]
    async fn test_add_beyond_stock_fails_without_writing() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let scarf = test_support::product(&db, "Wool Scarf", 2599, 1).await;

        let err = db.carts().add(TENANT, &user.id, &scarf.id, 2).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InsufficientStock { .. })));
        assert!(db.carts().load(TENANT, &user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cart_shows_live_prices() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let shirt = test_support::product(&db, "Linen Shirt", 4999, 10).await;
        db.carts().add(TENANT, &user.id, &shirt.id, 1).await.unwrap();

        db.products()
            .update(
                TENANT,
                &shirt.id,
                &bazaar_core::catalog::ProductUpdate {
                    price_cents: Some(3999),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let cart = db.carts().load(TENANT, &user.id).await.unwrap();
        assert_eq!(cart.subtotal().cents(), 3999);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let shirt = test_support::product(&db, "Linen Shirt", 4999, 10).await;
        db.carts().add(TENANT, &user.id, &shirt.id, 2).await.unwrap();

        let cart = db.carts().set_quantity(TENANT, &user.id, &shirt.id, 4).await.unwrap();
        assert_eq!(cart.total_quantity(), 4);

        let cart = db.carts().set_quantity(TENANT, &user.id, &shirt.id, 0).await.unwrap();
        assert!(cart.is_empty());
        assert!(db.carts().load(TENANT, &user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_line() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;

        let err = db.carts().remove(TENANT, &user.id, "nope").await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::NotInCart(_))));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;

        let err = db.carts().add(TENANT, &user.id, "missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
