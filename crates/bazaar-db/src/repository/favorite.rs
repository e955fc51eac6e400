//! # Favorite Repository
//!
//! A user's saved products. Adding is idempotent, and so is removing.

use bazaar_core::Product;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::product::{ProductRepository, PRODUCT_COLUMNS};
use crate::error::DbResult;

/// Repository for favorite operations.
#[derive(Debug, Clone)]
pub struct FavoriteRepository {
    pool: SqlitePool,
}

impl FavoriteRepository {
    /// Creates a new FavoriteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FavoriteRepository { pool }
    }

    /// Favorited products still on sale, most recently saved first.
    pub async fn list(&self, tenant_id: &str, user_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE tenant_id = ?2
              AND is_active = 1
              AND id IN (SELECT product_id FROM favorites WHERE user_id = ?1)
            ORDER BY (
                SELECT f.created_at FROM favorites f
                WHERE f.user_id = ?1 AND f.product_id = products.id
            ) DESC, id ASC
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(user_id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Saves a product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such product in this tenant
    pub async fn add(&self, tenant_id: &str, user_id: &str, product_id: &str) -> DbResult<()> {
        ProductRepository::new(self.pool.clone())
            .get(tenant_id, product_id)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, product_id, created_at) VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id, product_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(user = %user_id, product = %product_id, "Favorite added");
        Ok(())
    }

    /// Forgets a product. Returns whether it was saved.
    pub async fn remove(&self, user_id: &str, product_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the user saved the product.
    pub async fn contains(&self, user_id: &str, product_id: &str) -> DbResult<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS (SELECT 1 FROM favorites WHERE user_id = ?1 AND product_id = ?2)",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found == 1)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::repository::test_support::{self, TENANT};

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let shirt = test_support::product(&db, "Linen Shirt", 4999, 10).await;

        db.favorites().add(TENANT, &user.id, &shirt.id).await.unwrap();
        db.favorites().add(TENANT, &user.id, &shirt.id).await.unwrap();

        let list = db.favorites().list(TENANT, &user.id).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(db.favorites().contains(&user.id, &shirt.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_inactive_products_hidden() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let shirt = test_support::product(&db, "Linen Shirt", 4999, 10).await;
        let scarf = test_support::product(&db, "Wool Scarf", 2599, 3).await;
        db.favorites().add(TENANT, &user.id, &shirt.id).await.unwrap();
        db.favorites().add(TENANT, &user.id, &scarf.id).await.unwrap();

        db.products().soft_delete(TENANT, &scarf.id).await.unwrap();

        let list = db.favorites().list(TENANT, &user.id).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, shirt.id);
    }

    #[tokio::test]
    async fn test_remove_and_unknown_product() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let shirt = test_support::product(&db, "Linen Shirt", 4999, 10).await;
        db.favorites().add(TENANT, &user.id, &shirt.id).await.unwrap();

        assert!(db.favorites().remove(&user.id, &shirt.id).await.unwrap());
        assert!(!db.favorites().remove(&user.id, &shirt.id).await.unwrap());

        let err = db.favorites().add(TENANT, &user.id, "missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
