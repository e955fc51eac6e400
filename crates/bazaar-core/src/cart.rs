//! # Cart
//!
//! The shopping cart aggregate. The cart is persisted per user by bazaar-db;
//! this module owns the rules for changing it.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Storefront Action        HTTP Route                 Cart Change        │
//! │  ─────────────────        ──────────                 ───────────        │
//! │                                                                         │
//! │  Add to cart ───────────► POST /api/cart/items ────► add()             │
//! │                                                                         │
//! │  Change quantity ───────► PUT /api/cart/items/{id} ► set_quantity()    │
//! │                                                                         │
//! │  Remove ────────────────► DELETE /api/cart/items/… ► remove()          │
//! │                                                                         │
//! │  Empty cart ────────────► DELETE /api/cart ────────► clear()           │
//! │                                                                         │
//! │  Checkout ──────────────► POST /api/checkout ──────► ensure_available()│
//! │                                                     + OrderDraft        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pricing
//! Cart lines carry the product's *current* price and stock, loaded fresh
//! each time. Prices are frozen only when an order is placed (see
//! [`crate::orders::OrderDraft`]).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{validate_cart_size, validate_quantity};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// A product in the cart, joined with its live catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    /// Current catalog price in cents.
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub image_url: Option<String>,
    /// Units currently in stock.
    pub stock: i64,
    /// False once the product has been taken off sale.
    pub is_active: bool,
}

impl CartLine {
    /// Builds a line for a product that is not yet in the cart.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            image_url: product.image_url.clone(),
            stock: product.stock,
            is_active: product.is_active,
        }
    }

    /// unit price × quantity
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    fn ensure_in_stock(&self, quantity: i64) -> CoreResult<()> {
        if !self.is_active {
            return Err(CoreError::ProductUnavailable(self.product_id.clone()));
        }

        if self.stock < quantity {
            return Err(CoreError::InsufficientStock {
                product: self.name.clone(),
                available: self.stock,
                requested: quantity,
            });
        }

        Ok(())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product increases quantity)
/// - Quantity is always 1..=MAX_ITEM_QUANTITY (setting 0 removes the line)
/// - At most MAX_CART_ITEMS lines
/// - No line asks for more than the product's stock
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: String,
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Cart {
            user_id: user_id.into(),
            lines: Vec::new(),
        }
    }

    /// Rebuilds a cart from persisted lines.
    pub fn from_lines(user_id: impl Into<String>, lines: Vec<CartLine>) -> Self {
        Cart {
            user_id: user_id.into(),
            lines,
        }
    }

    /// Finds the line for a product.
    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Adds a product to the cart or increases quantity if already present.
    ///
    /// ## Returns
    /// The line as it now stands, so callers can persist its quantity.
    ///
    /// ## Errors
    /// - `Validation` if `quantity` is not 1..=MAX_ITEM_QUANTITY
    /// - `ProductUnavailable` for inactive products
    /// - `QuantityTooLarge` if the merged quantity exceeds the maximum
    /// - `InsufficientStock` if the merged quantity exceeds stock
    /// - `CartTooLarge` if a new line would exceed MAX_CART_ITEMS
    pub fn add(&mut self, product: &Product, quantity: i64) -> CoreResult<&CartLine> {
        validate_quantity(quantity)?;

        if !product.is_active {
            return Err(CoreError::ProductUnavailable(product.id.clone()));
        }

        match self.lines.iter().position(|l| l.product_id == product.id) {
            Some(index) => {
                let new_qty = self.lines[index].quantity + quantity;
                if new_qty > MAX_ITEM_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: new_qty,
                        max: MAX_ITEM_QUANTITY,
                    });
                }

                // Refresh from the product so price and stock are current
                let line = CartLine::from_product(product, new_qty);
                line.ensure_in_stock(new_qty)?;
                self.lines[index] = line;
                Ok(&self.lines[index])
            }
            None => {
                validate_cart_size(self.lines.len())
                    .map_err(|_| CoreError::CartTooLarge { max: MAX_CART_ITEMS })?;

                let line = CartLine::from_product(product, quantity);
                line.ensure_in_stock(quantity)?;
                self.lines.push(line);
                Ok(&self.lines[self.lines.len() - 1])
            }
        }
    }

    /// Sets the quantity of a line already in the cart.
    ///
    /// ## Behavior
    /// - `quantity == 0` removes the line and returns `Ok(None)`
    /// - Negative quantities are rejected
    /// - Product not in cart returns `NotInCart`
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<Option<&CartLine>> {
        if quantity == 0 {
            self.remove(product_id)?;
            return Ok(None);
        }

        if quantity < 0 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: MAX_ITEM_QUANTITY,
            }
            .into());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::NotInCart(product_id.to_string()))?;

        line.ensure_in_stock(quantity)?;
        line.quantity = quantity;
        Ok(Some(&*line))
    }

    /// Removes a line from the cart by product ID.
    pub fn remove(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == initial_len {
            Err(CoreError::NotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears all lines from the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Checks every line can still be bought at its current quantity.
    ///
    /// Stock and availability may have changed since the items were added,
    /// so checkout calls this on a freshly loaded cart.
    pub fn ensure_available(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        for line in &self.lines {
            line.ensure_in_stock(line.quantity)?;
        }

        Ok(())
    }

    /// Returns the number of distinct products in the cart.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line totals.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Cart totals summary for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal_cents: cart.subtotal().cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            category_id: None,
            sku: None,
            name: format!("Product {id}"),
            description: "test".to_string(),
            price_cents,
            original_price_cents: None,
            stock,
            image_url: None,
            is_featured: false,
            is_active: true,
            rating_tenths: 0,
            review_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_new_item() {
        let mut cart = Cart::new("u1");
        let product = create_test_product("p1", 299, 10);

        let line = cart.add(&product, 2).unwrap();
        assert_eq!(line.quantity, 2);

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal().cents(), 598);
    }

    #[test]
    fn test_add_existing_item_merges_quantity() {
        let mut cart = Cart::new("u1");
        let product = create_test_product("p1", 299, 10);

        cart.add(&product, 2).unwrap();
        cart.add(&product, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.line("p1").unwrap().quantity, 5);
    }

    #[test]
    fn test_add_refreshes_price() {
        let mut cart = Cart::new("u1");
        let mut product = create_test_product("p1", 299, 10);
        cart.add(&product, 1).unwrap();

        product.price_cents = 199;
        cart.add(&product, 1).unwrap();
        assert_eq!(cart.subtotal().cents(), 398);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = Cart::new("u1");
        let product = create_test_product("p1", 100, 10);

        assert!(matches!(cart.add(&product, 0), Err(CoreError::Validation(_))));
        assert!(matches!(cart.add(&product, -1), Err(CoreError::Validation(_))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_checks_stock_after_merge() {
        let mut cart = Cart::new("u1");
        let product = create_test_product("p1", 100, 5);

        cart.add(&product, 4).unwrap();
        let err = cart.add(&product, 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));
        // Failed add leaves the line untouched
        assert_eq!(cart.line("p1").unwrap().quantity, 4);
    }

    #[test]
    fn test_add_inactive_product() {
        let mut cart = Cart::new("u1");
        let mut product = create_test_product("p1", 100, 5);
        product.is_active = false;

        assert!(matches!(
            cart.add(&product, 1),
            Err(CoreError::ProductUnavailable(_))
        ));
    }

    #[test]
    fn test_quantity_limit() {
        let mut cart = Cart::new("u1");
        let product = create_test_product("p1", 100, 10_000);

        cart.add(&product, 500).unwrap();
        assert!(matches!(
            cart.add(&product, 500),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = Cart::new("u1");
        for i in 0..MAX_CART_ITEMS {
            cart.add(&create_test_product(&format!("p{i}"), 100, 1), 1)
                .unwrap();
        }

        let overflow = create_test_product("one-more", 100, 1);
        assert!(matches!(
            cart.add(&overflow, 1),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new("u1");
        let product = create_test_product("p1", 299, 10);
        cart.add(&product, 2).unwrap();

        let line = cart.set_quantity("p1", 5).unwrap().unwrap();
        assert_eq!(line.quantity, 5);

        assert!(matches!(
            cart.set_quantity("p1", 11),
            Err(CoreError::InsufficientStock { .. })
        ));
        assert!(matches!(
            cart.set_quantity("p1", -1),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            cart.set_quantity("missing", 1),
            Err(CoreError::NotInCart(_))
        ));
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new("u1");
        let product = create_test_product("p1", 299, 10);
        cart.add(&product, 2).unwrap();

        assert!(cart.set_quantity("p1", 0).unwrap().is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new("u1");
        cart.add(&create_test_product("p1", 100, 10), 1).unwrap();
        cart.add(&create_test_product("p2", 200, 10), 1).unwrap();

        cart.remove("p1").unwrap();
        assert_eq!(cart.item_count(), 1);
        assert!(matches!(cart.remove("p1"), Err(CoreError::NotInCart(_))));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::zero());
    }

    #[test]
    fn test_ensure_available() {
        assert!(matches!(
            Cart::new("u1").ensure_available(),
            Err(CoreError::EmptyCart)
        ));

        let mut cart = Cart::new("u1");
        cart.add(&create_test_product("p1", 100, 3), 3).unwrap();
        assert!(cart.ensure_available().is_ok());

        // Someone else bought two in the meantime
        cart.lines[0].stock = 1;
        assert!(matches!(
            cart.ensure_available(),
            Err(CoreError::InsufficientStock { .. })
        ));

        cart.lines[0].stock = 3;
        cart.lines[0].is_active = false;
        assert!(matches!(
            cart.ensure_available(),
            Err(CoreError::ProductUnavailable(_))
        ));
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new("u1");
        cart.add(&create_test_product("p1", 1000, 10), 2).unwrap();
        cart.add(&create_test_product("p2", 500, 10), 1).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.total_quantity, 3);
        assert_eq!(totals.subtotal_cents, 2500);
    }
}
