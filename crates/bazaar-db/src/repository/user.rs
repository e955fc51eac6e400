//! # User Repository
//!
//! Store-side user profiles.
//!
//! ## Profile Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Identity provider issues token (sub, email, role)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  First authenticated request                                           │
//! │       │  ensure_profile(): SELECT by id, INSERT if missing              │
//! │       ▼                                                                 │
//! │  users row (role from the token, status = active)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  From then on the stored role/status win over the token                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::pagination::{Page, PageRequest};
use bazaar_core::stats::UserStats;
use bazaar_core::validation::validate_email;
use bazaar_core::{CoreError, ProfileUpdate, User, UserRole, UserStatus};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::like_pattern;
use crate::error::{DbError, DbResult};

const USER_COLUMNS: &str = r#"
    id, tenant_id, email, display_name, phone, avatar_url,
    role, status, created_at, updated_at, last_login_at
"#;

const LIST_WHERE: &str = r#"
    WHERE tenant_id = ?1
      AND (?2 IS NULL OR role = ?2)
      AND (?3 IS NULL OR status = ?3)
      AND (?4 IS NULL OR email LIKE ?4 ESCAPE '\' OR display_name LIKE ?4 ESCAPE '\')
"#;

/// Identity claims used to create a profile on first sight.
#[derive(Debug, Clone)]
pub struct NewProfile {
    /// Token subject.
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: UserRole,
}

/// Filters for the back-office user list.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    /// Matches email or display name.
    pub search: Option<String>,
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Returns the profile for `profile.id`, creating it if missing.
    ///
    /// ## Returns
    /// * `Err(CoreError::Forbidden)` - The id belongs to another tenant
    /// * `Err(DbError::UniqueViolation)` - Another profile in the tenant has this email
    pub async fn ensure_profile(&self, tenant_id: &str, profile: &NewProfile) -> DbResult<User> {
        if let Some(user) = self.find(&profile.id).await? {
            if user.tenant_id != tenant_id {
                return Err(CoreError::Forbidden("user belongs to another store".to_string()).into());
            }
            return Ok(user);
        }

        validate_email(&profile.email)?;

        let now = Utc::now();
        let user = User {
            id: profile.id.clone(),
            tenant_id: tenant_id.to_string(),
            email: profile.email.trim().to_lowercase(),
            display_name: profile.display_name.clone(),
            phone: None,
            avatar_url: None,
            role: profile.role,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        // Two first requests can race; the loser reads the winner's row.
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (
                id, tenant_id, email, display_name, phone, avatar_url,
                role, status, created_at, updated_at, last_login_at
            ) VALUES (?1, ?2, ?3, ?4, NULL, NULL, ?5, ?6, ?7, ?8, NULL)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&user.id)
        .bind(&user.tenant_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role)
        .bind(user.status)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            e if e.is_unique_violation() => DbError::duplicate("email", &user.email),
            e => e,
        })?;

        if inserted.rows_affected() == 0 {
            return self.get(tenant_id, &profile.id).await;
        }

        info!(id = %user.id, role = %user.role, "User profile created");
        Ok(user)
    }

    /// Gets a user by ID within a tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND tenant_id = ?2");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    async fn find(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Stamps `last_login_at`.
    pub async fn touch_login(&self, tenant_id: &str, id: &str) -> DbResult<User> {
        let result = sqlx::query(
            "UPDATE users SET last_login_at = ?3 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get(tenant_id, id).await
    }

    /// Updates the customer-editable profile fields. `None` leaves a field as is.
    pub async fn update_profile(
        &self,
        tenant_id: &str,
        id: &str,
        update: &ProfileUpdate,
    ) -> DbResult<User> {
        update.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                display_name = COALESCE(?3, display_name),
                phone = COALESCE(?4, phone),
                avatar_url = COALESCE(?5, avatar_url),
                updated_at = ?6
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&update.display_name)
        .bind(&update.phone)
        .bind(&update.avatar_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get(tenant_id, id).await
    }

    /// Lists users for the back office, newest first.
    pub async fn list(
        &self,
        tenant_id: &str,
        filter: &UserFilter,
        page: PageRequest,
    ) -> DbResult<Page<User>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users {LIST_WHERE}"))
            .bind(tenant_id)
            .bind(filter.role)
            .bind(filter.status)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;

        if total == 0 {
            return Ok(Page::empty(page));
        }

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users {LIST_WHERE} ORDER BY created_at DESC, id DESC LIMIT ?5 OFFSET ?6"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(tenant_id)
            .bind(filter.role)
            .bind(filter.status)
            .bind(&search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(users, total, page))
    }

    /// Changes a user's role and/or status.
    pub async fn update_access(
        &self,
        tenant_id: &str,
        id: &str,
        role: Option<UserRole>,
        status: Option<UserStatus>,
    ) -> DbResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                role = COALESCE(?3, role),
                status = COALESCE(?4, status),
                updated_at = ?5
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(role)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, role = ?role, status = ?status, "User access changed");
        self.get(tenant_id, id).await
    }

    /// Deletes a user together with their reviews, likes, cart, favorites
    /// and addresses.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - The user has orders; orders are kept
    ///
    /// Products the user had reviewed get their rating recomputed in the
    /// same transaction.
    pub async fn delete(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let reviewed: Vec<String> = sqlx::query_scalar::<_, String>(
            r#"
            DELETE FROM reviews
            WHERE user_id = ?1 AND tenant_id = ?2 AND parent_id IS NULL
            RETURNING product_id
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        for product_id in &reviewed {
            super::review::recompute_rating(&mut *tx, product_id).await?;
        }

        tx.commit().await?;

        info!(id = %id, reviews = reviewed.len(), "User deleted");
        Ok(())
    }

    /// Account counts for the dashboard.
    pub async fn stats(&self, tenant_id: &str) -> DbResult<UserStats> {
        debug!(tenant = %tenant_id, "Computing user stats");

        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0) AS active,
                COALESCE(SUM(CASE WHEN status = 'inactive' THEN 1 ELSE 0 END), 0) AS inactive,
                COALESCE(SUM(CASE WHEN role = 'admin' THEN 1 ELSE 0 END), 0) AS admins,
                COALESCE(SUM(CASE WHEN role = 'customer' THEN 1 ELSE 0 END), 0) AS customers
            FROM users
            WHERE tenant_id = ?1
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{self, TENANT};

    #[tokio::test]
    async fn test_ensure_profile_is_idempotent() {
        let db = test_support::db().await;
        let profile = NewProfile {
            id: "user-1".to_string(),
            email: "Ada@Example.com".to_string(),
            display_name: Some("Ada".to_string()),
            role: UserRole::Customer,
        };

        let first = db.users().ensure_profile(TENANT, &profile).await.unwrap();
        assert_eq!(first.email, "ada@example.com");
        assert!(first.is_active());

        // The stored role wins over later tokens.
        let again = NewProfile {
            role: UserRole::Admin,
            ..profile
        };
        let second = db.users().ensure_profile(TENANT, &again).await.unwrap();
        assert_eq!(second.role, UserRole::Customer);
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_profile_from_other_tenant_is_refused() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;

        let err = db
            .users()
            .ensure_profile(
                "other-tenant",
                &NewProfile {
                    id: user.id.clone(),
                    email: user.email.clone(),
                    display_name: None,
                    role: UserRole::Customer,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_missing_fields() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;

        let updated = db
            .users()
            .update_profile(
                TENANT,
                &user.id,
                &ProfileUpdate {
                    phone: Some("555-0100".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
        assert_eq!(updated.display_name, user.display_name);
    }

    #[tokio::test]
    async fn test_list_filters_and_stats() {
        let db = test_support::db().await;
        let ada = test_support::user(&db, "ada@example.com", UserRole::Customer).await;
        test_support::user(&db, "grace@example.com", UserRole::Customer).await;
        test_support::user(&db, "root@example.com", UserRole::Admin).await;

        db.users()
            .update_access(TENANT, &ada.id, None, Some(UserStatus::Inactive))
            .await
            .unwrap();

        let admins = db
            .users()
            .list(
                TENANT,
                &UserFilter {
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(admins.meta.total, 1);

        let search = db
            .users()
            .list(
                TENANT,
                &UserFilter {
                    search: Some("grace".to_string()),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(search.data[0].email, "grace@example.com");

        let stats = db.users().stats(TENANT).await.unwrap();
        assert_eq!(
            stats,
            UserStats {
                total: 3,
                active: 2,
                inactive: 1,
                admins: 1,
                customers: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_touch_login() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;
        assert!(user.last_login_at.is_none());

        let user = db.users().touch_login(TENANT, &user.id).await.unwrap();
        assert!(user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = test_support::db().await;
        let user = test_support::customer(&db).await;

        db.users().delete(TENANT, &user.id).await.unwrap();
        assert!(matches!(
            db.users().get(TENANT, &user.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.users().delete(TENANT, &user.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
