//! Authentication and authorization utilities
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with argon2
//! - The [`Actor`] extractor carrying the caller's id and role

use crate::db::models::{User, UserRole};
use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shortest password accepted at signup
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authenticated caller: the only identity the workflow and projection layers see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: i64, role: UserRole) -> Self {
        Self { id, role }
    }

    /// Admins and super admins
    pub fn require_staff(&self) -> Result<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin access required"))
        }
    }

    /// Everyone except viewers
    pub fn require_author(&self) -> Result<()> {
        if self.role.can_author() {
            Ok(())
        } else {
            Err(AppError::forbidden("Viewers cannot modify content"))
        }
    }

    /// Staff acting on an account that holds, or is being given, `role`
    pub fn require_can_manage(&self, role: UserRole) -> Result<()> {
        self.require_staff()?;
        if self.role.can_manage(role) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Only super admins can manage {} accounts",
                role
            )))
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    pub email: String,

    /// Role name, e.g. `super_admin`
    pub role: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl JwtClaims {
    /// Resolve the claims into an [`Actor`], rejecting unknown roles
    pub fn actor(&self) -> Result<Actor> {
        let id = self.sub.parse::<i64>().map_err(|_| AppError::Unauthorized {
            message: "Invalid token subject".to_string(),
        })?;
        let role = self
            .role
            .parse::<UserRole>()
            .map_err(|message| AppError::Unauthorized { message })?;

        Ok(Actor { id, role })
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::Unauthorized {
                    message: "Invalid token".to_string(),
                },
            })
    }
}

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Check a password against a stored PHC string; a malformed hash never verifies
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extract the token from an `Authorization: Bearer` header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for Actor
impl<S> FromRequestParts<S> for Actor
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Expected a Bearer token".to_string(),
        })?;

        let jwt = Arc::<JwtManager>::from_ref(state);
        jwt.validate_token(token)?.actor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: UserRole) -> User {
        User {
            id,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            role,
            profile_picture: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc.def"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let token = manager.generate_token(&user(7, UserRole::Admin)).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.actor().unwrap(), Actor::new(7, UserRole::Admin));
    }

    #[test]
    fn test_jwt_wrong_secret() {
        let token = JwtManager::new("one", 3600)
            .generate_token(&user(1, UserRole::Editor))
            .unwrap();
        let err = JwtManager::new("two", 3600).validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let claims = JwtClaims {
            sub: "1".into(),
            email: "x@example.com".into(),
            role: "publisher".into(),
            exp: 0,
            iat: 0,
        };
        assert!(matches!(claims.actor(), Err(AppError::Unauthorized { .. })));
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn test_role_guards() {
        assert!(Actor::new(1, UserRole::Admin).require_staff().is_ok());
        assert!(Actor::new(1, UserRole::Editor).require_staff().is_err());
        assert!(Actor::new(1, UserRole::Editor).require_author().is_ok());
        assert!(Actor::new(1, UserRole::Viewer).require_author().is_err());

        let admin = Actor::new(1, UserRole::Admin);
        assert!(admin.require_can_manage(UserRole::Editor).is_ok());
        assert!(admin.require_can_manage(UserRole::SuperAdmin).is_err());
        let super_admin = Actor::new(2, UserRole::SuperAdmin);
        assert!(super_admin.require_can_manage(UserRole::Admin).is_ok());
    }
}
