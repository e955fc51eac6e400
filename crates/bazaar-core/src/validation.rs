//! # Validation Module
//!
//! Input validation utilities for Bazaar.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront / back-office frontend                            │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::validation::{validate_product_name, validate_quantity};
//!
//! assert!(validate_product_name("Linen Shirt").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS, MAX_STOCK};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound on review text.
pub const MAX_REVIEW_CONTENT: usize = 2000;

/// Upper bound on images attached to a single review.
pub const MAX_REVIEW_IMAGES: usize = 9;

// =============================================================================
// Shared Helpers
// =============================================================================

/// Trims `value` and checks it is non-empty and at most `max` characters.
fn require_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_sku;
///
/// assert!(validate_sku("SHIRT-LIN-M").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    require_text("sku", sku, 50)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "sku",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a product name (1..=200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    require_text("name", name, 200)
}

/// Validates a product description (1..=5000 characters).
pub fn validate_product_description(description: &str) -> ValidationResult<()> {
    require_text("description", description, 5000)
}

/// Validates a category name (1..=100 characters).
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    require_text("name", name, 100)
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (no keyword filter)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "keyword".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart/order quantity (1..=MAX_ITEM_QUANTITY).
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(1000).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents (0..=MAX_PRICE_CENTS). Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a stock level (0..=MAX_STOCK).
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }
    if stock > MAX_STOCK {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }

    Ok(())
}

/// Validates a stock adjustment. Either direction is capped at MAX_STOCK.
pub fn validate_stock_delta(delta: i64) -> ValidationResult<()> {
    if delta.unsigned_abs() > MAX_STOCK.unsigned_abs() {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_STOCK,
            max: MAX_STOCK,
        });
    }

    Ok(())
}

/// Validates the number of distinct lines already in a cart before adding one.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Review Validators
// =============================================================================

/// Validates a star rating (1..=5).
pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: 5,
        });
    }

    Ok(())
}

/// Validates review text (1..=MAX_REVIEW_CONTENT characters).
pub fn validate_review_content(content: &str) -> ValidationResult<()> {
    require_text("content", content, MAX_REVIEW_CONTENT)
}

/// Validates the image URLs attached to a review.
pub fn validate_review_images(images: &[String]) -> ValidationResult<()> {
    if images.len() > MAX_REVIEW_IMAGES {
        return Err(ValidationError::TooMany {
            field: "images".to_string(),
            max: MAX_REVIEW_IMAGES,
        });
    }

    if images.iter().any(|url| url.trim().is_empty()) {
        return Err(ValidationError::invalid_format(
            "images",
            "image URLs must not be empty",
        ));
    }

    Ok(())
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates an email address.
///
/// ## Rules
/// - Non-empty, at most 254 characters
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is neither first nor last
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_email;
///
/// assert!(validate_email("ada@example.com").is_ok());
/// assert!(validate_email("ada@localhost").is_err());
/// assert!(validate_email("@example.com").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    require_text("email", email, 254)?;

    let email = email.trim();
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(ValidationError::invalid_format("email", "must contain one @")),
    };

    let domain_ok = domain
        .find('.')
        .map(|_| !domain.starts_with('.') && !domain.ends_with('.'))
        .unwrap_or(false);

    if local.is_empty() || !domain_ok {
        return Err(ValidationError::invalid_format(
            "email",
            "must look like name@example.com",
        ));
    }

    Ok(())
}

/// Fields of a shipping address that are checked before saving.
#[derive(Debug, Clone, Copy)]
pub struct AddressFields<'a> {
    pub recipient_name: &'a str,
    pub address_line1: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub postal_code: &'a str,
    pub country: &'a str,
    pub phone: &'a str,
}

/// Validates a shipping address. All listed fields are required.
pub fn validate_address(fields: &AddressFields<'_>) -> ValidationResult<()> {
    require_text("recipient_name", fields.recipient_name, 100)?;
    require_text("address_line1", fields.address_line1, 200)?;
    require_text("city", fields.city, 100)?;
    require_text("state", fields.state, 100)?;
    require_text("postal_code", fields.postal_code, 20)?;
    require_text("country", fields.country, 100)?;
    require_text("phone", fields.phone, 30)?;
    Ok(())
}

// =============================================================================
// Misc Validators
// =============================================================================

/// Validates a carrier tracking number (1..=100 characters).
pub fn validate_tracking_number(tracking: &str) -> ValidationResult<()> {
    require_text("tracking_number", tracking, 100)
}

/// Validates a UUID string.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ValidationError::invalid_format("id", "must be a valid UUID"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("SHIRT-LIN-M").is_ok());
        assert!(validate_sku("mug_01").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
        assert!(validate_sku("bad sku").is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Linen Shirt").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1999).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
    }

    #[test]
    fn test_validate_upper_bounds() {
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(validate_price_cents(MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_price_cents(i64::MAX / 2 + 1).is_err());
        assert!(validate_stock(MAX_STOCK).is_ok());
        assert!(validate_stock(MAX_STOCK + 1).is_err());
        assert!(validate_stock_delta(-MAX_STOCK).is_ok());
        assert!(validate_stock_delta(MAX_STOCK + 1).is_err());
        assert!(validate_stock_delta(i64::MAX).is_err());
        assert!(validate_stock_delta(i64::MIN).is_err());
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_validate_review_content_counts_chars() {
        assert!(validate_review_content("Great fit").is_ok());
        assert!(validate_review_content("  ").is_err());
        // Multi-byte characters count once each
        assert!(validate_review_content(&"é".repeat(MAX_REVIEW_CONTENT)).is_ok());
        assert!(validate_review_content(&"é".repeat(MAX_REVIEW_CONTENT + 1)).is_err());
    }

    #[test]
    fn test_validate_review_images() {
        let ok: Vec<String> = (0..MAX_REVIEW_IMAGES).map(|i| format!("/img/{i}.jpg")).collect();
        assert!(validate_review_images(&ok).is_ok());

        let mut too_many = ok.clone();
        too_many.push("/img/x.jpg".to_string());
        assert!(validate_review_images(&too_many).is_err());

        assert!(validate_review_images(&[" ".to_string()]).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("a.b+c@shop.example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("ada@.com").is_err());
        assert!(validate_email("ada@example.").is_err());
    }

    #[test]
    fn test_validate_address() {
        let mut fields = AddressFields {
            recipient_name: "Ada Lovelace",
            address_line1: "12 St James's Square",
            city: "London",
            state: "London",
            postal_code: "SW1Y 4JH",
            country: "GB",
            phone: "+44 20 7946 0000",
        };
        assert!(validate_address(&fields).is_ok());

        fields.city = " ";
        let err = validate_address(&fields).unwrap_err();
        assert_eq!(err.to_string(), "city is required");
    }

    #[test]
    fn test_validate_search_query_trims() {
        assert_eq!(validate_search_query("  shirt ").unwrap(), "shirt");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("00000000-0000-0000-0000-000000000001").is_ok());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
