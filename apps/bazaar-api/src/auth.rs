//! # Authentication
//!
//! Bearer JWT verification and the extractors handlers use to identify the
//! caller.
//!
//! ## Request Flow
//! ```text
//! Authorization: Bearer <jwt>
//!       │
//!       ▼
//! JwtManager::validate()      ← HS256 signature + exp
//!       │
//!       ▼
//! users().ensure_profile()    ← profile row created on first sight
//!       │
//!       ├── status inactive → 403
//!       ▼
//! AuthUser { user }           ← stored role/status, not the token's
//!       │
//!       ▼
//! AdminUser                   ← additionally requires role = admin
//! ```
//!
//! Tokens come from the identity provider. [`JwtManager::issue`] exists for
//! the `dev_token` binary and tests.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use bazaar_core::{User, UserRole, DEFAULT_TENANT_ID};
use bazaar_db::NewProfile;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Header naming the store for anonymous catalog requests.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Store the user belongs to
    pub tenant_id: String,

    pub email: String,

    /// Display name, if the identity provider knows one
    #[serde(default)]
    pub name: Option<String>,

    /// Role used when the profile is first created
    #[serde(default)]
    pub role: UserRole,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID
    pub jti: String,
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    /// Mint a token.
    pub fn issue(
        &self,
        user_id: &str,
        tenant_id: &str,
        email: &str,
        role: UserRole,
    ) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            email: email.to_string(),
            name: None,
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Extractors
// =============================================================================

/// The authenticated, active caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn tenant(&self) -> &str {
        &self.0.tenant_id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state.jwt.validate(token)?;

        let user = state
            .db
            .users()
            .ensure_profile(
                &claims.tenant_id,
                &NewProfile {
                    id: claims.sub,
                    email: claims.email,
                    display_name: claims.name,
                    role: claims.role,
                },
            )
            .await?;

        if !user.is_active() {
            warn!(user = %user.id, "Inactive account refused");
            return Err(ApiError::Forbidden("Account is inactive".to_string()));
        }

        Ok(AuthUser(user))
    }
}

/// An authenticated caller whose stored role is admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl AdminUser {
    pub fn id(&self) -> &str {
        self.0.id()
    }

    pub fn tenant(&self) -> &str {
        self.0.tenant()
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

/// Store selected by `X-Tenant-Id`, defaulting to the single-store tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(TENANT_HEADER) else {
            return Ok(Tenant(DEFAULT_TENANT_ID.to_string()));
        };

        let tenant = value
            .to_str()
            .map(str::trim)
            .map_err(|_| ApiError::BadRequest("Invalid X-Tenant-Id header".to_string()))?;

        if tenant.is_empty() || tenant.len() > 64 {
            return Err(ApiError::BadRequest("Invalid X-Tenant-Id header".to_string()));
        }

        Ok(Tenant(tenant.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", 3600);

        let token = manager
            .issue("user-001", "tenant-001", "ada@example.com", UserRole::Admin)
            .unwrap();
        let claims = manager.validate(&token).unwrap();

        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.tenant_id, "tenant-001");
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a", 3600);
        let verifier = JwtManager::new("secret-b", 3600);

        let token = issuer
            .issue("user-001", "tenant-001", "ada@example.com", UserRole::Customer)
            .unwrap();
        assert!(matches!(verifier.validate(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s leeway
        let manager = JwtManager::new("test-secret", -120);

        let token = manager
            .issue("user-001", "tenant-001", "ada@example.com", UserRole::Customer)
            .unwrap();
        assert!(manager.validate(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
