use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::User;
use crate::services::auth;
use crate::AppState;

/// Authenticated caller. Accepts `Bearer <jwt>` or `Basic <email:password>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        AuthUser {
            user_id: user.id,
            email: user.email,
            is_staff: user.is_staff,
        }
    }
}

/// Authenticated caller with staff privilege; non-staff get 403.
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthUser);

enum Credentials {
    Bearer(String),
    Basic { email: String, password: String },
}

fn parse_authorization(value: &str) -> Option<Credentials> {
    if let Some(token) = value.strip_prefix("Bearer ") {
        let token = token.trim();
        return (!token.is_empty()).then(|| Credentials::Bearer(token.to_string()));
    }

    let encoded = value.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // формат email:password
    let (email, password) = credentials.split_once(':')?;
    Some(Credentials::Basic {
        email: email.to_string(),
        password: password.to_string(),
    })
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::AuthenticationRequired)?;

        let credentials =
            parse_authorization(header_value).ok_or(ApiError::AuthenticationRequired)?;

        let user = match credentials {
            Credentials::Bearer(token) => {
                let claims = auth::decode_token(&token, &state.config.jwt).map_err(|e| {
                    tracing::debug!("rejected bearer token: {e}");
                    ApiError::AuthenticationRequired
                })?;
                // перечитываем пользователя: блокировка и is_staff действуют до истечения токена
                state.store.find_user(claims.sub).await?
            }
            Credentials::Basic { email, password } => {
                match state.store.find_user_by_email(&email).await? {
                    Some(user) if auth::verify_password(password, user.password_hash.clone()).await => {
                        Some(user)
                    }
                    _ => None,
                }
            }
        };

        match user {
            Some(user) if user.is_active => Ok(user.into()),
            _ => Err(ApiError::AuthenticationRequired),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            tracing::debug!(user_id = user.user_id, "staff-only action refused");
            return Err(ApiError::PermissionDenied);
        }
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_credentials() {
        let encoded = general_purpose::STANDARD.encode("test@test.test:pa:ss");
        match parse_authorization(&format!("Basic {encoded}")) {
            Some(Credentials::Basic { email, password }) => {
                assert_eq!(email, "test@test.test");
                assert_eq!(password, "pa:ss");
            }
            _ => panic!("expected basic credentials"),
        }
    }

    #[test]
    fn rejects_unknown_schemes_and_garbage() {
        assert!(parse_authorization("Token abc").is_none());
        assert!(parse_authorization("Basic !!!").is_none());
        assert!(parse_authorization("Bearer ").is_none());
        assert!(matches!(parse_authorization("Bearer abc"), Some(Credentials::Bearer(t)) if t == "abc"));
    }
}
