//! # Review Repository
//!
//! Reviews, replies and likes.
//!
//! ## Threads
//! ```text
//!   review (rating 1..=5)          ← one per user per product
//!     ├── reply                    ← any number, never rated
//!     ├── reply
//!     └── likes (user ids)         ← one per user per review
//! ```
//! Replies to a reply are attached to the top-level review, so threads
//! stay one level deep.
//!
//! ## Product Rating
//! Any change that adds, removes or re-rates a top-level review recomputes
//! `products.rating_tenths` / `review_count` inside the same transaction.
//!
//! Every write returns the [`ReviewEvent`]s it produced; callers log them.

use bazaar_core::pagination::{Page, PageRequest};
use bazaar_core::reviews::{
    ensure_author, ensure_can_delete, RatingSummary, Review, ReviewDraft, ReviewEdit, ReviewEvent,
    ReviewFilter, ReviewSort,
};
use bazaar_core::{CoreError, ValidationError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;

const REVIEW_SELECT: &str = r#"
    SELECT
        r.id, r.tenant_id, r.product_id, r.user_id,
        u.display_name AS author_name,
        r.parent_id, r.content, r.rating, r.images,
        (SELECT COUNT(*) FROM review_likes l WHERE l.review_id = r.id) AS like_count,
        (SELECT COUNT(*) FROM reviews c WHERE c.parent_id = r.id) AS reply_count,
        r.created_at, r.updated_at
    FROM reviews r
    LEFT JOIN users u ON u.id = r.user_id
"#;

const PRODUCT_WHERE: &str = r#"
    WHERE r.tenant_id = ?1
      AND r.product_id = ?2
      AND r.parent_id IS NULL
      AND (?3 IS NULL OR r.rating = ?3)
      AND (?4 IS NULL OR (?4 = 1 AND r.images != '[]') OR (?4 = 0 AND r.images = '[]'))
      AND (?5 IS NULL OR r.created_at >= ?5)
      AND (?6 IS NULL OR r.created_at <= ?6)
"#;

/// Review row as stored: images are a JSON array.
#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: String,
    tenant_id: String,
    product_id: String,
    user_id: String,
    author_name: Option<String>,
    parent_id: Option<String>,
    content: String,
    rating: Option<i64>,
    images: String,
    like_count: i64,
    reply_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = DbError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let images: Vec<String> = serde_json::from_str(&row.images).map_err(|e| {
            DbError::Internal(format!("review {} has malformed images: {e}", row.id))
        })?;

        Ok(Review {
            id: row.id,
            tenant_id: row.tenant_id,
            product_id: row.product_id,
            user_id: row.user_id,
            author_name: row.author_name,
            parent_id: row.parent_id,
            content: row.content,
            rating: row.rating,
            images,
            like_count: row.like_count,
            reply_count: row.reply_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_reviews(rows: Vec<ReviewRow>) -> DbResult<Vec<Review>> {
    rows.into_iter().map(Review::try_from).collect()
}

fn images_json(images: &[String]) -> DbResult<String> {
    serde_json::to_string(images).map_err(|e| DbError::Internal(e.to_string()))
}

/// A review with its replies and the users who liked it.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewThread {
    #[serde(flatten)]
    pub review: Review,
    /// Oldest first.
    pub replies: Vec<Review>,
    pub liked_by: Vec<String>,
}

/// Row returned by `DELETE ... RETURNING`.
#[derive(Debug, sqlx::FromRow)]
struct DeletedReview {
    id: String,
    product_id: String,
    user_id: String,
    parent_id: Option<String>,
}

/// Repository for review operations.
#[derive(Debug, Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
    /// Creates a new ReviewRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReviewRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Top-level reviews of a product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such product in this tenant
    pub async fn list_for_product(
        &self,
        tenant_id: &str,
        product_id: &str,
        filter: &ReviewFilter,
        sort: ReviewSort,
        page: PageRequest,
    ) -> DbResult<Page<Review>> {
        filter.validate()?;
        ProductRepository::new(self.pool.clone())
            .get(tenant_id, product_id)
            .await?;

        debug!(product = %product_id, sort = %sort.as_sql(), page = page.page(), "Listing reviews");

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM reviews r {PRODUCT_WHERE}"
        ))
        .bind(tenant_id)
        .bind(product_id)
        .bind(filter.rating)
        .bind(filter.has_images)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_one(&self.pool)
        .await?;

        if total == 0 {
            return Ok(Page::empty(page));
        }

        let sql = format!(
            "{REVIEW_SELECT} {PRODUCT_WHERE} ORDER BY {} LIMIT ?7 OFFSET ?8",
            sort.as_sql()
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(tenant_id)
            .bind(product_id)
            .bind(filter.rating)
            .bind(filter.has_images)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(into_reviews(rows)?, total, page))
    }

    /// Gets a review or reply by ID.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Review> {
        let sql = format!("{REVIEW_SELECT} WHERE r.id = ?1 AND r.tenant_id = ?2");
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::from(CoreError::ReviewNotFound(id.to_string())))?;

        Review::try_from(row)
    }

    /// A review with all its replies and likers.
    pub async fn thread(&self, tenant_id: &str, id: &str) -> DbResult<ReviewThread> {
        let review = self.get(tenant_id, id).await?;

        let sql = format!(
            "{REVIEW_SELECT} WHERE r.parent_id = ?1 AND r.tenant_id = ?2 ORDER BY r.created_at ASC, r.id ASC"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        let liked_by = self.likers(id).await?;

        Ok(ReviewThread {
            review,
            replies: into_reviews(rows)?,
            liked_by,
        })
    }

    /// Replies to a review, oldest first.
    pub async fn replies(
        &self,
        tenant_id: &str,
        parent_id: &str,
        page: PageRequest,
    ) -> DbResult<Page<Review>> {
        self.get(tenant_id, parent_id).await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reviews WHERE parent_id = ?1 AND tenant_id = ?2",
        )
        .bind(parent_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "{REVIEW_SELECT} WHERE r.parent_id = ?1 AND r.tenant_id = ?2 ORDER BY r.created_at ASC, r.id ASC LIMIT ?3 OFFSET ?4"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(parent_id)
            .bind(tenant_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(into_reviews(rows)?, total, page))
    }

    /// User ids that liked a review, in the order they liked it.
    pub async fn likers(&self, review_id: &str) -> DbResult<Vec<String>> {
        let users = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM review_likes WHERE review_id = ?1 ORDER BY created_at ASC, user_id ASC",
        )
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Posts a review, or a reply when `draft.parent_id` is set.
    ///
    /// ## Returns
    /// * `Err(CoreError::AlreadyReviewed)` - The user already reviewed this product
    /// * `Err(CoreError::ProductUnavailable)` - The product is off sale
    /// * `Err(CoreError::ReviewNotFound)` - The parent review does not exist
    pub async fn create(
        &self,
        tenant_id: &str,
        product_id: &str,
        user_id: &str,
        draft: &ReviewDraft,
    ) -> DbResult<(Review, ReviewEvent)> {
        draft.validate()?;

        let product = ProductRepository::new(self.pool.clone())
            .get(tenant_id, product_id)
            .await?;
        if !product.is_active {
            return Err(CoreError::ProductUnavailable(product_id.to_string()).into());
        }

        let parent_id = match &draft.parent_id {
            Some(parent_id) => {
                let parent = self.get(tenant_id, parent_id).await?;
                if parent.product_id != product_id {
                    return Err(ValidationError::invalid_format(
                        "parent_id",
                        "belongs to another product",
                    )
                    .into());
                }
                Some(parent.parent_id.unwrap_or(parent.id))
            }
            None => None,
        };

        let id = new_id();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO reviews (
                id, tenant_id, product_id, user_id, parent_id,
                content, rating, images, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(product_id)
        .bind(user_id)
        .bind(&parent_id)
        .bind(draft.content.trim())
        .bind(draft.rating)
        .bind(images_json(&draft.images)?)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            e if e.is_unique_violation() => DbError::from(CoreError::AlreadyReviewed {
                product_id: product_id.to_string(),
            }),
            e => e,
        })?;

        if parent_id.is_none() {
            recompute_rating(&mut *tx, product_id).await?;
        }

        tx.commit().await?;

        let event = match parent_id {
            Some(parent_id) => ReviewEvent::Replied {
                reply_id: id.clone(),
                parent_id,
                user_id: user_id.to_string(),
            },
            None => ReviewEvent::Created {
                review_id: id.clone(),
                product_id: product_id.to_string(),
                user_id: user_id.to_string(),
            },
        };

        Ok((self.get(tenant_id, &id).await?, event))
    }

    /// Edits the actor's own review or reply.
    pub async fn update(
        &self,
        tenant_id: &str,
        id: &str,
        actor_id: &str,
        edit: &ReviewEdit,
    ) -> DbResult<(Review, ReviewEvent)> {
        let mut review = self.get(tenant_id, id).await?;
        ensure_author(&review, actor_id)?;
        let rating_changed = edit.apply(&mut review)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE reviews SET content = ?3, rating = ?4, images = ?5, updated_at = ?6
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&review.content)
        .bind(review.rating)
        .bind(images_json(&review.images)?)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if rating_changed {
            recompute_rating(&mut *tx, &review.product_id).await?;
        }

        tx.commit().await?;

        let event = ReviewEvent::Updated {
            review_id: id.to_string(),
            user_id: actor_id.to_string(),
        };

        Ok((self.get(tenant_id, id).await?, event))
    }

    /// Deletes a review (with its replies and likes) or a single reply.
    ///
    /// Authors may delete their own; admins may delete any.
    pub async fn delete(
        &self,
        tenant_id: &str,
        id: &str,
        actor_id: &str,
        is_admin: bool,
    ) -> DbResult<ReviewEvent> {
        let review = self.get(tenant_id, id).await?;
        ensure_can_delete(&review, actor_id, is_admin)?;

        let mut events = self.delete_many(tenant_id, &[id.to_string()]).await?;
        events
            .pop()
            .ok_or_else(|| CoreError::ReviewNotFound(id.to_string()).into())
    }

    /// Back-office bulk delete. Ids that no longer exist are skipped.
    pub async fn batch_delete(&self, tenant_id: &str, ids: &[String]) -> DbResult<Vec<ReviewEvent>> {
        let events = self.delete_many(tenant_id, ids).await?;
        info!(requested = ids.len(), deleted = events.len(), "Reviews batch deleted");
        Ok(events)
    }

    async fn delete_many(&self, tenant_id: &str, ids: &[String]) -> DbResult<Vec<ReviewEvent>> {
        let mut tx = self.pool.begin().await?;
        let mut rerate = BTreeSet::new();
        let mut events = Vec::with_capacity(ids.len());

        for id in ids {
            let deleted = sqlx::query_as::<_, DeletedReview>(
                r#"
                DELETE FROM reviews WHERE id = ?1 AND tenant_id = ?2
                RETURNING id, product_id, user_id, parent_id
                "#,
            )
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&mut *tx)
            .await?;

            // Replies of an already deleted review are gone by cascade.
            let Some(deleted) = deleted else { continue };

            if deleted.parent_id.is_none() {
                rerate.insert(deleted.product_id.clone());
            }
            events.push(ReviewEvent::Deleted {
                review_id: deleted.id,
                product_id: deleted.product_id,
                user_id: deleted.user_id,
            });
        }

        for product_id in &rerate {
            recompute_rating(&mut *tx, product_id).await?;
        }

        tx.commit().await?;

        Ok(events)
    }

    /// Likes a review or reply.
    ///
    /// ## Returns
    /// * `Err(CoreError::AlreadyLiked)` - The user already likes it
    pub async fn like(&self, tenant_id: &str, id: &str, user_id: &str) -> DbResult<ReviewEvent> {
        self.get(tenant_id, id).await?;

        sqlx::query("INSERT INTO review_likes (review_id, user_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                e if e.is_unique_violation() => DbError::from(CoreError::AlreadyLiked),
                e => e,
            })?;

        let event = ReviewEvent::Liked {
            review_id: id.to_string(),
            user_id: user_id.to_string(),
        };
        Ok(event)
    }

    /// Withdraws a like.
    ///
    /// ## Returns
    /// * `Err(CoreError::NotLiked)` - The user does not like it
    pub async fn unlike(&self, tenant_id: &str, id: &str, user_id: &str) -> DbResult<ReviewEvent> {
        self.get(tenant_id, id).await?;

        let result = sqlx::query("DELETE FROM review_likes WHERE review_id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotLiked.into());
        }

        let event = ReviewEvent::Unliked {
            review_id: id.to_string(),
            user_id: user_id.to_string(),
        };
        Ok(event)
    }
}

/// Recomputes a product's rating from its top-level reviews.
///
/// Runs on the caller's transaction connection.
pub(crate) async fn recompute_rating(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<RatingSummary> {
    let ratings = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT rating FROM reviews
        WHERE product_id = ?1 AND parent_id IS NULL AND rating IS NOT NULL
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let summary = RatingSummary::from_ratings(&ratings);

    sqlx::query("UPDATE products SET rating_tenths = ?2, review_count = ?3 WHERE id = ?1")
        .bind(product_id)
        .bind(summary.rating_tenths)
        .bind(summary.review_count)
        .execute(&mut *conn)
        .await?;

    debug!(
        product = %product_id,
        rating_tenths = summary.rating_tenths,
        reviews = summary.review_count,
        "Product rating recomputed"
    );
    Ok(summary)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{self, TENANT};
    use crate::Database;
    use bazaar_core::pagination::SortDirection;
    use bazaar_core::reviews::ReviewSortField;
    use bazaar_core::{Product, User, UserRole};

    fn rated(content: &str, rating: i64) -> ReviewDraft {
        ReviewDraft {
            content: content.to_string(),
            rating: Some(rating),
            images: Vec::new(),
            parent_id: None,
        }
    }

    fn reply(parent: &str, content: &str) -> ReviewDraft {
        ReviewDraft {
            content: content.to_string(),
            rating: None,
            images: Vec::new(),
            parent_id: Some(parent.to_string()),
        }
    }

    async fn setup() -> (Database, User, User, Product) {
        let db = test_support::db().await;
        let ada = test_support::customer(&db).await;
        let grace = test_support::user(&db, "grace@example.com", UserRole::Customer).await;
        let product = test_support::product(&db, "Linen Shirt", 4999, 10).await;
        (db, ada, grace, product)
    }

    #[tokio::test]
    async fn test_create_updates_product_rating() {
        let (db, ada, grace, product) = setup().await;

        let (review, event) = db
            .reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Great fit", 5))
            .await
            .unwrap();
        assert_eq!(review.author_name.as_deref(), Some("ada"));
        assert!(matches!(event, ReviewEvent::Created { .. }));

        db.reviews()
            .create(TENANT, &product.id, &grace.id, &rated("Runs small", 4))
            .await
            .unwrap();

        let product = db.products().get(TENANT, &product.id).await.unwrap();
        assert_eq!(product.review_count, 2);
        assert_eq!(product.rating_tenths, 45);
    }

    #[tokio::test]
    async fn test_one_review_per_user() {
        let (db, ada, _, product) = setup().await;
        db.reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Great", 5))
            .await
            .unwrap();

        let err = db
            .reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Again", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::AlreadyReviewed { .. })));
    }

    #[tokio::test]
    async fn test_replies_stay_one_level_deep() {
        let (db, ada, grace, product) = setup().await;
        let (review, _) = db
            .reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Great", 5))
            .await
            .unwrap();

        let (first, event) = db
            .reviews()
            .create(TENANT, &product.id, &grace.id, &reply(&review.id, "Agreed"))
            .await
            .unwrap();
        assert!(matches!(event, ReviewEvent::Replied { .. }));

        let (nested, _) = db
            .reviews()
            .create(TENANT, &product.id, &ada.id, &reply(&first.id, "Thanks"))
            .await
            .unwrap();
        assert_eq!(nested.parent_id.as_deref(), Some(review.id.as_str()));

        let thread = db.reviews().thread(TENANT, &review.id).await.unwrap();
        assert_eq!(thread.review.reply_count, 2);
        let contents: Vec<_> = thread.replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["Agreed", "Thanks"]);

        // Replies never count towards the rating.
        let product = db.products().get(TENANT, &product.id).await.unwrap();
        assert_eq!(product.review_count, 1);
    }

    #[tokio::test]
    async fn test_like_and_unlike() {
        let (db, ada, grace, product) = setup().await;
        let (review, _) = db
            .reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Great", 5))
            .await
            .unwrap();

        db.reviews().like(TENANT, &review.id, &grace.id).await.unwrap();
        let err = db.reviews().like(TENANT, &review.id, &grace.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::AlreadyLiked)));

        assert_eq!(db.reviews().get(TENANT, &review.id).await.unwrap().like_count, 1);
        assert_eq!(db.reviews().likers(&review.id).await.unwrap(), vec![grace.id.clone()]);

        let event = db.reviews().unlike(TENANT, &review.id, &grace.id).await.unwrap();
        assert!(matches!(event, ReviewEvent::Unliked { .. }));
        let err = db.reviews().unlike(TENANT, &review.id, &grace.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::NotLiked)));
    }

    #[tokio::test]
    async fn test_only_author_edits() {
        let (db, ada, grace, product) = setup().await;
        let (review, _) = db
            .reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Great", 5))
            .await
            .unwrap();

        let edit = ReviewEdit {
            rating: Some(3),
            ..Default::default()
        };
        let err = db
            .reviews()
            .update(TENANT, &review.id, &grace.id, &edit)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Forbidden(_))));

        let (updated, _) = db
            .reviews()
            .update(TENANT, &review.id, &ada.id, &edit)
            .await
            .unwrap();
        assert_eq!(updated.rating, Some(3));
        assert_eq!(
            db.products().get(TENANT, &product.id).await.unwrap().rating_tenths,
            30
        );
    }

    #[tokio::test]
    async fn test_delete_cascades_and_rerates() {
        let (db, ada, grace, product) = setup().await;
        let (review, _) = db
            .reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Great", 5))
            .await
            .unwrap();
        db.reviews()
            .create(TENANT, &product.id, &grace.id, &reply(&review.id, "Agreed"))
            .await
            .unwrap();

        let err = db
            .reviews()
            .delete(TENANT, &review.id, &grace.id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Forbidden(_))));

        let event = db.reviews().delete(TENANT, &review.id, &grace.id, true).await.unwrap();
        assert!(matches!(event, ReviewEvent::Deleted { .. }));

        let product = db.products().get(TENANT, &product.id).await.unwrap();
        assert_eq!(product.review_count, 0);
        assert_eq!(product.rating_tenths, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let (db, ada, grace, product) = setup().await;
        let (liked, _) = db
            .reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Great", 5))
            .await
            .unwrap();
        let mut with_image = rated("Photo attached", 2);
        with_image.images = vec!["/img/photo.jpg".to_string()];
        db.reviews()
            .create(TENANT, &product.id, &grace.id, &with_image)
            .await
            .unwrap();
        db.reviews().like(TENANT, &liked.id, &grace.id).await.unwrap();

        let by_likes = db
            .reviews()
            .list_for_product(
                TENANT,
                &product.id,
                &ReviewFilter::default(),
                ReviewSort {
                    field: ReviewSortField::Likes,
                    direction: SortDirection::Desc,
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(by_likes.meta.total, 2);
        assert_eq!(by_likes.data[0].id, liked.id);

        let images_only = db
            .reviews()
            .list_for_product(
                TENANT,
                &product.id,
                &ReviewFilter {
                    has_images: Some(true),
                    ..Default::default()
                },
                ReviewSort::default(),
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(images_only.meta.total, 1);
        assert_eq!(images_only.data[0].images, vec!["/img/photo.jpg".to_string()]);

        let five_star = db
            .reviews()
            .list_for_product(
                TENANT,
                &product.id,
                &ReviewFilter {
                    rating: Some(5),
                    ..Default::default()
                },
                ReviewSort::default(),
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(five_star.meta.total, 1);
    }

    #[tokio::test]
    async fn test_batch_delete_skips_missing() {
        let (db, ada, grace, product) = setup().await;
        let (a, _) = db
            .reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Great", 5))
            .await
            .unwrap();
        let (b, _) = db
            .reviews()
            .create(TENANT, &product.id, &grace.id, &rated("Fine", 3))
            .await
            .unwrap();

        let events = db
            .reviews()
            .batch_delete(TENANT, &[a.id.clone(), "missing".to_string(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(db.products().get(TENANT, &product.id).await.unwrap().review_count, 0);
    }

    #[tokio::test]
    async fn test_deleting_user_rerates_products() {
        let (db, ada, grace, product) = setup().await;
        db.reviews()
            .create(TENANT, &product.id, &ada.id, &rated("Great", 5))
            .await
            .unwrap();
        db.reviews()
            .create(TENANT, &product.id, &grace.id, &rated("Poor", 1))
            .await
            .unwrap();

        db.users().delete(TENANT, &grace.id).await.unwrap();

        let product = db.products().get(TENANT, &product.id).await.unwrap();
        assert_eq!(product.review_count, 1);
        assert_eq!(product.rating_tenths, 50);
    }
}
