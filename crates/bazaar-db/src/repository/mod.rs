//! # Repository Module
//!
//! Database repository implementations for Bazaar.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.carts().add(tenant, user, product, 2)                      │
//! │       ▼                                                                 │
//! │  CartRepository                                                        │
//! │  ├── load: SELECT cart lines joined with live product rows             │
//! │  ├── apply the bazaar-core Cart rules                                  │
//! │  └── persist the changed line                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Rules live in bazaar-core; SQL lives here.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactions
//! Multi-row writes (checkout, cancellation, review changes that move a
//! product's rating) run in one transaction. Inside a transaction every
//! statement goes through `&mut *tx`; touching the pool there would wait on
//! the connection the transaction already holds.
//!
//! Write transactions start with their guarded write (`UPDATE ... WHERE`,
//! `DELETE ... RETURNING`) so SQLite takes the write lock before any read.
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`] - Categories with product counts
//! - [`ProductRepository`] - Catalog search, CRUD and stock
//! - [`CartRepository`] - Per-user carts
//! - [`OrderRepository`] - Checkout, order lifecycle, order analytics
//! - [`ReviewRepository`] - Reviews, replies, likes
//! - [`UserRepository`] - Profiles, roles, account status
//! - [`AddressRepository`] - Saved shipping addresses
//! - [`FavoriteRepository`] - Wishlist

pub mod address;
pub mod cart;
pub mod category;
pub mod favorite;
pub mod order;
pub mod product;
pub mod review;
pub mod user;

pub use address::AddressRepository;
pub use cart::CartRepository;
pub use category::CategoryRepository;
pub use favorite::FavoriteRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use review::ReviewRepository;
pub use user::UserRepository;

use uuid::Uuid;

/// New primary key (UUID v4 as text).
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// `%keyword%` with LIKE wildcards escaped. Use with `ESCAPE '\'`.
pub(crate) fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use bazaar_core::catalog::ProductInput;
    use bazaar_core::{AddressInput, Product, ShippingAddress, User, UserRole, DEFAULT_TENANT_ID};

    use super::user::NewProfile;
    use crate::pool::{Database, DbConfig};

    pub const TENANT: &str = DEFAULT_TENANT_ID;

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn user(db: &Database, email: &str, role: UserRole) -> User {
        db.users()
            .ensure_profile(
                TENANT,
                &NewProfile {
                    id: super::new_id(),
                    email: email.to_string(),
                    display_name: Some(email.split('@').next().unwrap_or(email).to_string()),
                    role,
                },
            )
            .await
            .unwrap()
    }

    pub async fn customer(db: &Database) -> User {
        user(db, "ada@example.com", UserRole::Customer).await
    }

    pub async fn product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        db.products()
            .insert(
                TENANT,
                &ProductInput {
                    name: name.to_string(),
                    description: format!("{name} description"),
                    price_cents,
                    original_price_cents: None,
                    stock,
                    image_url: Some(format!("/img/{}.jpg", name.to_lowercase().replace(' ', "-"))),
                    category_id: None,
                    sku: None,
                    is_featured: false,
                },
            )
            .await
            .unwrap()
    }

    pub fn address_input(recipient: &str) -> AddressInput {
        AddressInput {
            recipient_name: recipient.to_string(),
            address_line1: "12 St James's Square".to_string(),
            address_line2: None,
            city: "London".to_string(),
            state: "London".to_string(),
            postal_code: "SW1Y 4JH".to_string(),
            country: "GB".to_string(),
            phone: "020 7946 0000".to_string(),
            is_default: false,
        }
    }

    pub async fn address(db: &Database, user_id: &str) -> ShippingAddress {
        db.addresses()
            .create(user_id, &address_input("Ada Lovelace"))
            .await
            .unwrap()
    }
}
