//! # Category Repository
//!
//! Database operations for product categories.
//!
//! Deleting a category never deletes products: the foreign key is
//! `ON DELETE SET NULL`, so its products simply become uncategorized.

use bazaar_core::catalog::CategoryInput;
use bazaar_core::Category;
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};

/// A category with the number of active products in it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategorySummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub product_count: i64,
}

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Lists a tenant's categories by name, with active product counts.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<CategorySummary>> {
        let categories = sqlx::query_as::<_, CategorySummary>(
            r#"
            SELECT
                c.id, c.tenant_id, c.name, c.description, c.created_at,
                (SELECT COUNT(*) FROM products p
                  WHERE p.category_id = c.id AND p.is_active = 1) AS product_count
            FROM categories c
            WHERE c.tenant_id = ?1
            ORDER BY c.name ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = categories.len(), "Listed categories");
        Ok(categories)
    }

    /// Gets a category by ID.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such category in this tenant
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, tenant_id, name, description, created_at
            FROM categories
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Inserts a new category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Name already used in this tenant
    pub async fn insert(&self, tenant_id: &str, input: &CategoryInput) -> DbResult<Category> {
        input.validate()?;

        let category = Category {
            id: new_id(),
            tenant_id: tenant_id.to_string(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO categories (id, tenant_id, name, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&category.id)
        .bind(&category.tenant_id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_name(e, &category.name))?;

        info!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Renames or re-describes a category.
    pub async fn update(
        &self,
        tenant_id: &str,
        id: &str,
        input: &CategoryInput,
    ) -> DbResult<Category> {
        input.validate()?;
        let name = input.name.trim();

        let result = sqlx::query(
            r#"
            UPDATE categories SET name = ?3, description = ?4
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(name)
        .bind(&input.description)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_name(e, name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        self.get(tenant_id, id).await
    }

    /// Deletes a category. Its products become uncategorized.
    pub async fn delete(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        info!(id = %id, "Category deleted");
        Ok(())
    }
}

fn duplicate_name(err: sqlx::Error, name: &str) -> DbError {
    match DbError::from(err) {
        e if e.is_unique_violation() => DbError::duplicate("category name", name),
        e => e,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{self, TENANT};
    use bazaar_core::catalog::ProductUpdate;

    fn input(name: &str) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_insert_list_and_count() {
        let db = test_support::db().await;
        let shirts = db.categories().insert(TENANT, &input("Shirts")).await.unwrap();
        db.categories().insert(TENANT, &input("Accessories")).await.unwrap();

        let product = test_support::product(&db, "Linen Shirt", 4999, 5).await;
        db.products()
            .update(
                TENANT,
                &product.id,
                &ProductUpdate {
                    category_id: Some(Some(shirts.id.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let list = db.categories().list(TENANT).await.unwrap();
        let names: Vec<_> = list.iter().map(|c| c.category.name.as_str()).collect();
        assert_eq!(names, vec!["Accessories", "Shirts"]);
        assert_eq!(list[1].product_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = test_support::db().await;
        db.categories().insert(TENANT, &input("Shirts")).await.unwrap();

        let err = db.categories().insert(TENANT, &input("Shirts")).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_delete_uncategorizes_products() {
        let db = test_support::db().await;
        let shirts = db.categories().insert(TENANT, &input("Shirts")).await.unwrap();
        let product = test_support::product(&db, "Linen Shirt", 4999, 5).await;
        db.products()
            .update(
                TENANT,
                &product.id,
                &ProductUpdate {
                    category_id: Some(Some(shirts.id.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        db.categories().delete(TENANT, &shirts.id).await.unwrap();

        let product = db.products().get(TENANT, &product.id).await.unwrap();
        assert!(product.category_id.is_none());
        assert!(matches!(
            db.categories().get(TENANT, &shirts.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_category() {
        let db = test_support::db().await;
        let err = db
            .categories()
            .update(TENANT, "missing", &input("Hats"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
