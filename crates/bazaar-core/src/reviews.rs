//! # Reviews
//!
//! Product reviews and their replies, plus the events each change produces.
//!
//! ## Shape
//! ```text
//! Product
//!   └── Review (top-level, rated 1..=5, one per user per product)
//!         ├── Reply (no rating)
//!         ├── Reply
//!         └── Likes (one per user)
//! ```
//!
//! Every mutating repository call returns the [`ReviewEvent`]s it caused so
//! the caller can log or forward them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::pagination::SortDirection;
use crate::validation::{validate_rating, validate_review_content, validate_review_images};

// =============================================================================
// Review
// =============================================================================

/// A review (top-level) or a reply to one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Review {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub user_id: String,
    /// Display name of the author at read time.
    pub author_name: Option<String>,
    /// Set for replies.
    pub parent_id: Option<String>,
    pub content: String,
    /// 1..=5 on top-level reviews, always `None` on replies.
    pub rating: Option<i64>,
    pub images: Vec<String>,
    pub like_count: i64,
    pub reply_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Review {
    #[inline]
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Fails with `Forbidden` unless `actor_id` wrote the review.
pub fn ensure_author(review: &Review, actor_id: &str) -> CoreResult<()> {
    if review.user_id != actor_id {
        return Err(CoreError::Forbidden(
            "only the author can change this review".to_string(),
        ));
    }
    Ok(())
}

/// Authors can delete their own reviews; admins can delete any.
pub fn ensure_can_delete(review: &Review, actor_id: &str, is_admin: bool) -> CoreResult<()> {
    if is_admin {
        return Ok(());
    }
    ensure_author(review, actor_id)
}

// =============================================================================
// Draft / Edit
// =============================================================================

/// A new review or reply as submitted by a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReviewDraft {
    pub content: String,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Review being replied to.
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl ReviewDraft {
    /// ## Rules
    /// - content 1..=2000 characters, at most 9 images
    /// - top-level reviews need a rating 1..=5
    /// - replies must not carry a rating
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_review_content(&self.content)?;
        validate_review_images(&self.images)?;

        match (&self.parent_id, self.rating) {
            (None, None) => Err(ValidationError::required("rating")),
            (None, Some(rating)) => validate_rating(rating),
            (Some(_), Some(_)) => Err(ValidationError::invalid_format(
                "rating",
                "replies cannot be rated",
            )),
            (Some(_), None) => Ok(()),
        }
    }
}

/// A partial edit. `None` fields stay as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReviewEdit {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

impl ReviewEdit {
    /// Validates and applies the edit.
    ///
    /// ## Returns
    /// `true` if the rating changed, which means the product's aggregate
    /// rating must be recomputed.
    pub fn apply(&self, review: &mut Review) -> CoreResult<bool> {
        if let Some(content) = &self.content {
            validate_review_content(content)?;
        }
        if let Some(images) = &self.images {
            validate_review_images(images)?;
        }
        if let Some(rating) = self.rating {
            if review.is_reply() {
                return Err(ValidationError::invalid_format("rating", "replies cannot be rated").into());
            }
            validate_rating(rating)?;
        }

        if let Some(content) = &self.content {
            review.content = content.trim().to_string();
        }
        if let Some(images) = &self.images {
            review.images = images.clone();
        }

        let rating_changed = match self.rating {
            Some(rating) if review.rating != Some(rating) => {
                review.rating = Some(rating);
                true
            }
            _ => false,
        };

        Ok(rating_changed)
    }
}

// =============================================================================
// Domain Events
// =============================================================================

/// Something that happened to a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewEvent {
    Created {
        review_id: String,
        product_id: String,
        user_id: String,
    },
    Updated {
        review_id: String,
        user_id: String,
    },
    Deleted {
        review_id: String,
        product_id: String,
        user_id: String,
    },
    Liked {
        review_id: String,
        user_id: String,
    },
    Unliked {
        review_id: String,
        user_id: String,
    },
    Replied {
        reply_id: String,
        parent_id: String,
        user_id: String,
    },
}

impl ReviewEvent {
    /// Short event name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            ReviewEvent::Created { .. } => "review.created",
            ReviewEvent::Updated { .. } => "review.updated",
            ReviewEvent::Deleted { .. } => "review.deleted",
            ReviewEvent::Liked { .. } => "review.liked",
            ReviewEvent::Unliked { .. } => "review.unliked",
            ReviewEvent::Replied { .. } => "review.replied",
        }
    }
}

// =============================================================================
// Rating Summary
// =============================================================================

/// Aggregate rating stored on the product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RatingSummary {
    pub review_count: i64,
    /// Average × 10, rounded half up (4.25 → 43).
    pub rating_tenths: i64,
}

impl RatingSummary {
    /// Summarizes a set of 1..=5 ratings. No ratings gives 0/0.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::reviews::RatingSummary;
    ///
    /// let summary = RatingSummary::from_ratings(&[5, 4, 4]);
    /// assert_eq!(summary.review_count, 3);
    /// assert_eq!(summary.rating_tenths, 43); // 4.333.. → 4.3
    /// ```
    pub fn from_ratings(ratings: &[i64]) -> Self {
        let count = ratings.len() as i64;
        if count == 0 {
            return RatingSummary::default();
        }

        let sum: i64 = ratings.iter().sum();
        RatingSummary {
            review_count: count,
            rating_tenths: (sum * 20 + count) / (2 * count),
        }
    }
}

// =============================================================================
// Listing
// =============================================================================

/// Column reviews are sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSortField {
    #[default]
    CreatedAt,
    Rating,
    Likes,
}

impl ReviewSortField {
    pub const fn column(&self) -> &'static str {
        match self {
            ReviewSortField::CreatedAt => "r.created_at",
            ReviewSortField::Rating => "r.rating",
            ReviewSortField::Likes => "like_count",
        }
    }
}

impl FromStr for ReviewSortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" | "createdAt" => Ok(ReviewSortField::CreatedAt),
            "rating" => Ok(ReviewSortField::Rating),
            "likes" => Ok(ReviewSortField::Likes),
            _ => Err(ValidationError::NotAllowed {
                field: "sort_field".to_string(),
                allowed: vec![
                    "created_at".to_string(),
                    "rating".to_string(),
                    "likes".to_string(),
                ],
            }),
        }
    }
}

/// Sort for a review list. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewSort {
    pub field: ReviewSortField,
    pub direction: SortDirection,
}

impl ReviewSort {
    /// `ORDER BY` clause with a stable tie-break.
    pub fn as_sql(&self) -> String {
        let dir = self.direction.as_sql();
        format!("{} {dir}, r.id {dir}", self.field.column())
    }
}

/// Filters for a product's review list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub rating: Option<i64>,
    pub has_images: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ReviewFilter {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
