//! # Catalog
//!
//! Back-office payloads for categories and products, and the storefront's
//! product search options.
//!
//! ## Partial Updates
//! [`ProductUpdate`] distinguishes "leave alone" from "clear":
//! ```text
//! { }                        → category unchanged
//! { "category_id": null }    → category cleared
//! { "category_id": "c-1" }   → category set
//! ```

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::types::Product;
use crate::validation::{
    validate_category_name, validate_price_cents, validate_product_description,
    validate_product_name, validate_search_query, validate_sku, validate_stock,
};

/// Missing → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_category_name(&self.name)
    }
}

// =============================================================================
// Products
// =============================================================================

/// A new product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub original_price_cents: Option<i64>,
    #[serde(default)]
    pub stock: i64,
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl ProductInput {
    /// ## Rules
    /// - name, description and image are required
    /// - prices and stock must not be negative
    /// - a SKU, when given, must be well-formed
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_product_name(&self.name)?;
        validate_product_description(&self.description)?;
        validate_price_cents(self.price_cents)?;
        if let Some(original) = self.original_price_cents {
            validate_price_cents(original)?;
        }
        validate_stock(self.stock)?;
        if self
            .image_url
            .as_deref()
            .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ValidationError::required("image_url"));
        }
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        Ok(())
    }
}

/// A partial product edit. Stock is changed through stock adjustments only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub original_price_cents: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub category_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(optional)]
    pub sku: Option<Option<String>>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    /// Validates every supplied field, then applies them all.
    ///
    /// Nothing is changed if any field is invalid.
    pub fn apply(&self, product: &mut Product) -> CoreResult<()> {
        if let Some(name) = &self.name {
            validate_product_name(name)?;
        }
        if let Some(description) = &self.description {
            validate_product_description(description)?;
        }
        if let Some(price) = self.price_cents {
            validate_price_cents(price)?;
        }
        if let Some(Some(original)) = self.original_price_cents {
            validate_price_cents(original)?;
        }
        if let Some(Some(sku)) = &self.sku {
            validate_sku(sku)?;
        }

        if let Some(name) = &self.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            product.description = description.trim().to_string();
        }
        if let Some(price) = self.price_cents {
            product.price_cents = price;
        }
        if let Some(original) = self.original_price_cents {
            product.original_price_cents = original;
        }
        if let Some(image_url) = &self.image_url {
            product.image_url = image_url.clone();
        }
        if let Some(category_id) = &self.category_id {
            product.category_id = category_id.clone();
        }
        if let Some(sku) = &self.sku {
            product.sku = sku.as_ref().map(|s| s.trim().to_string());
        }
        if let Some(featured) = self.is_featured {
            product.is_featured = featured;
        }
        if let Some(active) = self.is_active {
            product.is_active = active;
        }
        product.updated_at = Utc::now();

        Ok(())
    }
}

// =============================================================================
// Search
// =============================================================================

/// Storefront sort options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    /// Most reviewed first.
    Popular,
    /// Best rated first.
    Rating,
}

impl ProductSort {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            ProductSort::Newest => "created_at DESC, id DESC",
            ProductSort::PriceAsc => "price_cents ASC, id ASC",
            ProductSort::PriceDesc => "price_cents DESC, id DESC",
            ProductSort::Popular => "review_count DESC, id DESC",
            ProductSort::Rating => "rating_tenths DESC, review_count DESC, id DESC",
        }
    }
}

impl FromStr for ProductSort {
    type Err = ValidationError;

    /// Accepts snake_case and the camelCase names older clients send.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" | "latest" => Ok(ProductSort::Newest),
            "price_asc" | "priceAsc" => Ok(ProductSort::PriceAsc),
            "price_desc" | "priceDesc" => Ok(ProductSort::PriceDesc),
            "popular" => Ok(ProductSort::Popular),
            "rating" => Ok(ProductSort::Rating),
            _ => Err(ValidationError::NotAllowed {
                field: "sort".to_string(),
                allowed: ["newest", "price_asc", "price_desc", "popular", "rating"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// Storefront search filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive match on name or description.
    pub keyword: Option<String>,
    pub category_id: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub featured_only: bool,
    /// Back-office listings see deactivated products too.
    pub include_inactive: bool,
}

impl ProductFilter {
    /// Validates ranges and normalizes the keyword (trimmed, empty → none).
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        if let Some(keyword) = self.keyword.take() {
            let keyword = validate_search_query(&keyword)?;
            self.keyword = (!keyword.is_empty()).then_some(keyword);
        }

        if let (Some(min), Some(max)) = (self.min_price_cents, self.max_price_cents) {
            if min > max {
                return Err(ValidationError::invalid_format(
                    "min_price",
                    "must not exceed max_price",
                ));
            }
        }

        Ok(self)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
