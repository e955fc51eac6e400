//! # Address Repository
//!
//! Saved shipping addresses.
//!
//! ## Default Address
//! A partial unique index allows at most one `is_default = 1` row per user.
//! Every operation that changes the default clears the old one first, in
//! the same transaction. The first address a user saves becomes the
//! default, and deleting the default promotes the newest remaining one.

use bazaar_core::{AddressInput, ShippingAddress};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};

const ADDRESS_COLUMNS: &str = r#"
    id, user_id, recipient_name, address_line1, address_line2,
    city, state, postal_code, country, phone, is_default, created_at
"#;

/// Repository for shipping address operations.
#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    /// Creates a new AddressRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AddressRepository { pool }
    }

    /// A user's addresses, default first, then newest.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<ShippingAddress>> {
        let sql = format!(
            r#"
            SELECT {ADDRESS_COLUMNS} FROM shipping_addresses
            WHERE user_id = ?1
            ORDER BY is_default DESC, created_at DESC, id DESC
            "#
        );
        let addresses = sqlx::query_as::<_, ShippingAddress>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(addresses)
    }

    /// Gets one of the user's addresses.
    pub async fn get(&self, user_id: &str, id: &str) -> DbResult<ShippingAddress> {
        fetch(&self.pool, user_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Address", id))
    }

    /// The user's default address, if any.
    pub async fn default_for(&self, user_id: &str) -> DbResult<Option<ShippingAddress>> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM shipping_addresses WHERE user_id = ?1 AND is_default = 1"
        );
        let address = sqlx::query_as::<_, ShippingAddress>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(address)
    }

    /// Saves a new address.
    ///
    /// It becomes the default when `input.is_default` is set or when it is
    /// the user's first address.
    pub async fn create(&self, user_id: &str, input: &AddressInput) -> DbResult<ShippingAddress> {
        input.validate()?;

        let id = new_id();
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut *tx, user_id).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO shipping_addresses (
                id, user_id, recipient_name, address_line1, address_line2,
                city, state, postal_code, country, phone, is_default, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                CASE WHEN ?11 = 1 OR NOT EXISTS (
                    SELECT 1 FROM shipping_addresses WHERE user_id = ?2
                ) THEN 1 ELSE 0 END,
                ?12
            )
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(input.recipient_name.trim())
        .bind(input.address_line1.trim())
        .bind(input.address_line2.as_deref().map(str::trim))
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(input.postal_code.trim())
        .bind(input.country.trim())
        .bind(input.phone.trim())
        .bind(input.is_default)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let address = fetch(&mut *tx, user_id, &id)
            .await?
            .ok_or_else(|| DbError::not_found("Address", &id))?;

        tx.commit().await?;

        info!(id = %id, user = %user_id, is_default = address.is_default, "Address saved");
        Ok(address)
    }

    /// Replaces an address's fields. Setting `is_default` makes it the default;
    /// clearing it on the current default is ignored (there is always one).
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        input: &AddressInput,
    ) -> DbResult<ShippingAddress> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut *tx, user_id).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE shipping_addresses SET
                recipient_name = ?3,
                address_line1 = ?4,
                address_line2 = ?5,
                city = ?6,
                state = ?7,
                postal_code = ?8,
                country = ?9,
                phone = ?10,
                is_default = CASE WHEN ?11 = 1 THEN 1 ELSE is_default END
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(input.recipient_name.trim())
        .bind(input.address_line1.trim())
        .bind(input.address_line2.as_deref().map(str::trim))
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(input.postal_code.trim())
        .bind(input.country.trim())
        .bind(input.phone.trim())
        .bind(input.is_default)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Address", id));
        }

        let address = fetch(&mut *tx, user_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Address", id))?;

        tx.commit().await?;
        Ok(address)
    }

    /// Makes `id` the user's default address.
    pub async fn set_default(&self, user_id: &str, id: &str) -> DbResult<ShippingAddress> {
        let mut tx = self.pool.begin().await?;

        clear_default(&mut *tx, user_id).await?;

        let result = sqlx::query(
            "UPDATE shipping_addresses SET is_default = 1 WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Address", id));
        }

        let address = fetch(&mut *tx, user_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Address", id))?;

        tx.commit().await?;

        debug!(id = %id, user = %user_id, "Default address changed");
        Ok(address)
    }

    /// Deletes an address. Past orders keep their frozen `ship_to` label.
    pub async fn delete(&self, user_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let was_default = sqlx::query_scalar::<_, bool>(
            "DELETE FROM shipping_addresses WHERE id = ?1 AND user_id = ?2 RETURNING is_default",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Address", id))?;

        if was_default {
            sqlx::query(
                r#"
                UPDATE shipping_addresses SET is_default = 1
                WHERE id = (
                    SELECT id FROM shipping_addresses
                    WHERE user_id = ?1
                    ORDER BY created_at DESC, id DESC
                    LIMIT 1
                )
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %id, user = %user_id, "Address deleted");
        Ok(())
    }
}

async fn clear_default(conn: &mut SqliteConnection, user_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE shipping_addresses SET is_default = 0 WHERE user_id = ?1 AND is_default = 1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn fetch<'e, E>(executor: E, user_id: &str, id: &str) -> DbResult<Option<ShippingAddress>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let sql = format!("SELECT {ADDRESS_COLUMNS} FROM shipping_addresses WHERE id = ?1 AND user_id = ?2");
    let address = sqlx::query_as::<_, ShippingAddress>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(address)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{self, address_input};

    #[tokio::test]
    async fn test_first_address_becomes_default() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;

        let first = db.addresses().create(&user.id, &address_input("Home")).await.unwrap();
        let second = db.addresses().create(&user.id, &address_input("Office")).await.unwrap();

        assert!(first.is_default);
        assert!(!second.is_default);
        assert_eq!(
            db.addresses().default_for(&user.id).await.unwrap().unwrap().id,
            first.id
        );
    }

    #[tokio::test]
    async fn test_set_default_moves_flag() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let home = db.addresses().create(&user.id, &address_input("Home")).await.unwrap();
        let office = db.addresses().create(&user.id, &address_input("Office")).await.unwrap();

        db.addresses().set_default(&user.id, &office.id).await.unwrap();

        let list = db.addresses().list(&user.id).await.unwrap();
        assert_eq!(list[0].id, office.id);
        assert!(list[0].is_default);
        assert!(!db.addresses().get(&user.id, &home.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn test_deleting_default_promotes_another() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let home = db.addresses().create(&user.id, &address_input("Home")).await.unwrap();
        let office = db.addresses().create(&user.id, &address_input("Office")).await.unwrap();

        db.addresses().delete(&user.id, &home.id).await.unwrap();

        let default = db.addresses().default_for(&user.id).await.unwrap().unwrap();
        assert_eq!(default.id, office.id);
    }

    #[tokio::test]
    async fn test_other_users_address_is_not_found() {
        let db = test_support::db().await;
        let ada = test_support::customer(&db).await;
        let grace =
            test_support::user(&db, "grace@example.com", bazaar_core::UserRole::Customer).await;
        let address = test_support::address(&db, &ada.id).await;

        assert!(matches!(
            db.addresses().get(&grace.id, &address.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.addresses().delete(&grace.id, &address.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_address_rejected() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        let mut input = address_input("Home");
        input.postal_code = "  ".to_string();

        let err = db.addresses().create(&user.id, &input).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(_)));
    }
}
