//! Credentials: bcrypt password hashes and HS256 access tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::models::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub email: String,
    pub is_staff: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access: String,
    pub token_type: &'static str,
    /// Seconds until expiry.
    pub expires_in: i64,
}

pub fn issue_token(user: &User, config: &JwtConfig) -> Result<AccessToken, ApiError> {
    let now = Utc::now();
    let ttl = Duration::hours(config.expires_in_hours);
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        is_staff: user.is_staff,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    let access = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(ApiError::internal)?;

    Ok(AccessToken {
        access,
        token_type: "Bearer",
        expires_in: ttl.num_seconds(),
    })
}

pub fn decode_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// bcrypt is deliberately slow, so it runs off the async workers.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)
}

pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            expires_in_hours: 2,
        }
    }

    fn user() -> User {
        User {
            id: 42,
            email: "admin@admin.test".into(),
            password_hash: String::new(),
            is_staff: true,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let token = issue_token(&user(), &config()).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 7200);

        let claims = decode_token(&token.access, &config()).unwrap();
        assert_eq!(claims.sub, 42);
        assert!(claims.is_staff);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&user(), &config()).unwrap();
        let other = JwtConfig {
            secret: "another".into(),
            expires_in_hours: 2,
        };
        assert!(decode_token(&token.access, &other).is_err());
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hash = hash_password("testpassword".into(), 4).await.unwrap();
        assert!(verify_password("testpassword".into(), hash.clone()).await);
        assert!(!verify_password("wrong".into(), hash).await);
    }
}
