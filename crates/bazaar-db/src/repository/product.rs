//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Storefront search (keyword, category, price range, featured)
//! - Back-office CRUD with soft delete
//! - Guarded stock adjustments
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Search Works                                     │
//! │                                                                         │
//! │  GET /api/products?keyword=shirt&min_price=1000&sort=price_asc         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductFilter::normalized() ← trims keyword, rejects min > max        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WHERE tenant_id = ?1                                                  │
//! │    AND (?2 = 1 OR is_active = 1)                                       │
//! │    AND (?3 IS NULL OR name LIKE ?3 OR description LIKE ?3)             │
//! │    AND ... one "(?n IS NULL OR ...)" per optional filter               │
//! │       │                                                                 │
//! │       ├──► SELECT COUNT(*)          → PageMeta.total                   │
//! │       └──► SELECT ... ORDER BY <whitelisted> LIMIT/OFFSET → data       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::catalog::{ProductFilter, ProductInput, ProductSort, ProductUpdate};
use bazaar_core::pagination::{Page, PageRequest};
use bazaar_core::stats::ProductStats;
use bazaar_core::validation::{validate_stock, validate_stock_delta};
use bazaar_core::{CoreError, Product, LOW_STOCK_THRESHOLD, MAX_STOCK};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{like_pattern, new_id};
use crate::error::{DbError, DbResult};

pub(crate) const PRODUCT_COLUMNS: &str = r#"
    id, tenant_id, category_id, sku, name, description,
    price_cents, original_price_cents, stock, image_url,
    is_featured, is_active, rating_tenths, review_count,
    created_at, updated_at
"#;

const SEARCH_WHERE: &str = r#"
    WHERE tenant_id = ?1
      AND (?2 = 1 OR is_active = 1)
      AND (?3 IS NULL OR name LIKE ?3 ESCAPE '\' OR description LIKE ?3 ESCAPE '\')
      AND (?4 IS NULL OR category_id = ?4)
      AND (?5 IS NULL OR price_cents >= ?5)
      AND (?6 IS NULL OR price_cents <= ?6)
      AND (?7 = 0 OR is_featured = 1)
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let page = repo.search(tenant, &filter, ProductSort::PriceAsc, page).await?;
/// let product = repo.get(tenant, "uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches the catalog.
    ///
    /// ## Arguments
    /// * `filter` - Normalized with [`ProductFilter::normalized`] before use
    /// * `sort` - Whitelisted ORDER BY
    /// * `page` - Page number and size
    ///
    /// ## Returns
    /// One page of products plus the total match count.
    pub async fn search(
        &self,
        tenant_id: &str,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> DbResult<Page<Product>> {
        let filter = filter.clone().normalized()?;
        let keyword = filter.keyword.as_deref().map(like_pattern);

        debug!(
            keyword = ?filter.keyword,
            category = ?filter.category_id,
            sort = ?sort,
            page = page.page(),
            "Searching products"
        );

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM products {SEARCH_WHERE}"))
            .bind(tenant_id)
            .bind(filter.include_inactive)
            .bind(&keyword)
            .bind(&filter.category_id)
            .bind(filter.min_price_cents)
            .bind(filter.max_price_cents)
            .bind(filter.featured_only)
            .fetch_one(&self.pool)
            .await?;

        if total == 0 {
            return Ok(Page::empty(page));
        }

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products {SEARCH_WHERE} ORDER BY {} LIMIT ?8 OFFSET ?9",
            sort.as_sql()
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(filter.include_inactive)
            .bind(&keyword)
            .bind(&filter.category_id)
            .bind(filter.min_price_cents)
            .bind(filter.max_price_cents)
            .bind(filter.featured_only)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), total, "Search returned products");
        Ok(Page::new(products, total, page))
    }

    /// Featured, active products for the home page. Newest first.
    pub async fn featured(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE tenant_id = ?1 AND is_featured = 1 AND is_active = 1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by ID, active or not.
    ///
    /// Storefront handlers hide inactive products themselves.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such product in this tenant
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Product> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND tenant_id = ?2");
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists in this tenant
    /// * `Err(DbError::NotFound)` - `category_id` names no category in this tenant
    pub async fn insert(&self, tenant_id: &str, input: &ProductInput) -> DbResult<Product> {
        input.validate()?;
        if let Some(category_id) = &input.category_id {
            self.ensure_category(tenant_id, category_id).await?;
        }

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            tenant_id: tenant_id.to_string(),
            category_id: input.category_id.clone(),
            sku: input.sku.as_ref().map(|s| s.trim().to_string()),
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            price_cents: input.price_cents,
            original_price_cents: input.original_price_cents,
            stock: input.stock,
            image_url: input.image_url.clone(),
            is_featured: input.is_featured,
            is_active: true,
            rating_tenths: 0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, category_id, sku, name, description,
                price_cents, original_price_cents, stock, image_url,
                is_featured, is_active, rating_tenths, review_count,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.category_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.original_price_cents)
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(product.is_featured)
        .bind(product.is_active)
        .bind(product.rating_tenths)
        .bind(product.review_count)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_sku(e, product.sku.as_deref()))?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Applies a partial edit.
    ///
    /// Stock and rating columns are left alone: stock moves only through
    /// [`adjust_stock`](Self::adjust_stock), ratings only through reviews.
    pub async fn update(
        &self,
        tenant_id: &str,
        id: &str,
        update: &ProductUpdate,
    ) -> DbResult<Product> {
        let mut product = self.get(tenant_id, id).await?;
        update.apply(&mut product)?;

        if let Some(Some(category_id)) = &update.category_id {
            self.ensure_category(tenant_id, category_id).await?;
        }

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                category_id = ?3,
                sku = ?4,
                name = ?5,
                description = ?6,
                price_cents = ?7,
                original_price_cents = ?8,
                image_url = ?9,
                is_featured = ?10,
                is_active = ?11,
                updated_at = ?12
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&product.category_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.original_price_cents)
        .bind(&product.image_url)
        .bind(product.is_featured)
        .bind(product.is_active)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_sku(e, product.sku.as_deref()))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get(tenant_id, id).await
    }

    /// Moves stock by `delta` (negative to remove units).
    ///
    /// ## Delta Updates
    /// ```text
    ///   ❌ read stock, compute, write absolute value  (lost updates)
    ///   ✅ UPDATE ... SET stock = stock + ?delta
    ///      WHERE stock + ?delta >= 0                   (atomic, guarded)
    /// ```
    ///
    /// ## Returns
    /// * `Err(CoreError::InsufficientStock)` - The delta would go below zero
    /// * `Err(ValidationError::OutOfRange)` - `|delta|` or the new stock exceeds `MAX_STOCK`
    pub async fn adjust_stock(&self, tenant_id: &str, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta, "Adjusting stock");
        validate_stock_delta(delta)?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?3, updated_at = ?4
            WHERE id = ?1 AND tenant_id = ?2 AND stock + ?3 >= 0 AND stock + ?3 <= ?5
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(delta)
        .bind(Utc::now())
        .bind(MAX_STOCK)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let product = self.get(tenant_id, id).await?;
            if delta > 0 {
                validate_stock(product.stock.saturating_add(delta))?;
            }
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: delta.saturating_neg(),
            }
            .into());
        }

        let product = self.get(tenant_id, id).await?;
        info!(id = %id, delta, stock = product.stock, "Stock adjusted");
        Ok(product)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// Order items keep pointing at the product row, and a deactivated
    /// product can be restored from the back office.
    pub async fn soft_delete(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = 0, is_featured = 0, updated_at = ?3
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Catalog counts for the dashboard. Inactive products are ignored.
    pub async fn stats(&self, tenant_id: &str) -> DbResult<ProductStats> {
        let stats = sqlx::query_as::<_, ProductStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN stock = 0 THEN 1 ELSE 0 END), 0) AS out_of_stock,
                COALESCE(SUM(CASE WHEN is_featured = 1 THEN 1 ELSE 0 END), 0) AS featured,
                COALESCE(SUM(CASE WHEN stock > 0 AND stock <= ?2 THEN 1 ELSE 0 END), 0) AS low_stock
            FROM products
            WHERE tenant_id = ?1 AND is_active = 1
            "#,
        )
        .bind(tenant_id)
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn ensure_category(&self, tenant_id: &str, category_id: &str) -> DbResult<()> {
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT 1 FROM categories WHERE id = ?1 AND tenant_id = ?2")
                .bind(category_id)
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await?;

        match exists {
            Some(_) => Ok(()),
            None => Err(DbError::not_found("Category", category_id)),
        }
    }
}

fn duplicate_sku(err: sqlx::Error, sku: Option<&str>) -> DbError {
    match DbError::from(err) {
        e if e.is_unique_violation() => DbError::duplicate("sku", sku.unwrap_or_default()),
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

    async fn seeded() -> crate::Database {
        let db = test_support::db().await;
        test_support::product(&db, "Linen Shirt", 4999, 10).await;
        test_support::product(&db, "Wool Scarf", 2599, 0).await;
        test_support::product(&db, "Canvas Tote", 1500, 3).await;
        db
    }

    #[tokio::test]
    async fn test_search_by_keyword_is_case_insensitive() {
        let db = seeded().await;
        let filter = ProductFilter {
            keyword: Some("SHIRT".to_string()),
            ..Default::default()
        };

        let page = db
            .products()
            .search(TENANT, &filter, ProductSort::Newest, PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].name, "Linen Shirt");
    }

    #[tokio::test]
    async fn test_search_price_range_and_sort() {
        let db = seeded().await;
        let filter = ProductFilter {
            min_price_cents: Some(1000),
            max_price_cents: Some(3000),
            ..Default::default()
        };

        let page = db
            .products()
            .search(TENANT, &filter, ProductSort::PriceDesc, PageRequest::default())
            .await
            .unwrap();

        let names: Vec<_> = page.data.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Wool Scarf", "Canvas Tote"]);
    }

    #[tokio::test]
    async fn test_search_paginates() {
        let db = seeded().await;

        let page = db
            .products()
            .search(
                TENANT,
                &ProductFilter::default(),
                ProductSort::PriceAsc,
                PageRequest::new(Some(2), Some(2)),
            )
            .await
            .unwrap();

        assert_eq!(page.meta.total, 3);
        assert_eq!(page.meta.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "Linen Shirt");
    }

    #[tokio::test]
    async fn test_keyword_wildcards_are_literal() {
        let db = seeded().await;
        let filter = ProductFilter {
            keyword: Some("%".to_string()),
            ..Default::default()
        };

        let page = db
            .products()
            .search(TENANT, &filter, ProductSort::Newest, PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.meta.total, 0);
    }

    #[tokio::test]
    async fn test_soft_deleted_products_hidden_from_storefront() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Linen Shirt", 4999, 10).await;
        db.products().soft_delete(TENANT, &product.id).await.unwrap();

        let storefront = db
            .products()
            .search(TENANT, &ProductFilter::default(), ProductSort::Newest, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(storefront.meta.total, 0);

        let admin = ProductFilter {
            include_inactive: true,
            ..Default::default()
        };
        let back_office = db
            .products()
            .search(TENANT, &admin, ProductSort::Newest, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(back_office.meta.total, 1);
        assert!(!back_office.data[0].is_active);
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Linen Shirt", 4999, 2).await;

        let updated = db.products().adjust_stock(TENANT, &product.id, 5).await.unwrap();
        assert_eq!(updated.stock, 7);

        let err = db
            .products()
            .adjust_stock(TENANT, &product.id, -8)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::InsufficientStock { available: 7, requested: 8, .. })
        ));
    }

    #[tokio::test]
    async fn test_adjust_stock_rejects_extreme_deltas() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Linen Shirt", 4999, 2).await;

        for delta in [i64::MAX, i64::MIN, MAX_STOCK + 1, -(MAX_STOCK + 1)] {
            let err = db
                .products()
                .adjust_stock(TENANT, &product.id, delta)
                .await
                .unwrap_err();
            assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));
        }

        let unchanged = db.products().get(TENANT, &product.id).await.unwrap();
        assert_eq!(unchanged.stock, 2);
    }

    #[tokio::test]
    async fn test_adjust_stock_caps_at_max_stock() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Linen Shirt", 4999, 2).await;

        let err = db
            .products()
            .adjust_stock(TENANT, &product.id, MAX_STOCK - 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        let full = db
            .products()
            .adjust_stock(TENANT, &product.id, MAX_STOCK - 2)
            .await
            .unwrap();
        assert_eq!(full.stock, MAX_STOCK);
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let db = test_support::db().await;
        let mut input = ProductInput {
            name: "Linen Shirt".to_string(),
            description: "Shirt".to_string(),
            price_cents: 4999,
            original_price_cents: None,
            stock: 1,
            image_url: Some("/img/a.jpg".to_string()),
            category_id: None,
            sku: Some("SHIRT-1".to_string()),
            is_featured: false,
        };
        db.products().insert(TENANT, &input).await.unwrap();

        input.name = "Other Shirt".to_string();
        let err = db.products().insert(TENANT, &input).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Linen Shirt", 4999, 2).await;

        let err = db
            .products()
            .update(
                TENANT,
                &product.id,
                &ProductUpdate {
                    category_id: Some(Some("missing".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_stats() {
        let db = seeded().await;
        let stats = db.products().stats(TENANT).await.unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.low_stock, 1);
        assert_eq!(stats.featured, 0);
    }
}
