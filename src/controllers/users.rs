use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::middleware::AuthUser;
use crate::models::{NewUser, User};
use crate::services::auth::{self, AccessToken};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(token))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

// POST /api/user/register
async fn register(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password_hash = auth::hash_password(request.password, state.config.auth.bcrypt_cost).await?;
    let user = state
        .store
        .create_user(NewUser {
            email: request.email,
            password_hash,
            is_staff: false,
        })
        .await?;
    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

// POST /api/user/token
async fn token(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<TokenRequest>,
) -> Result<Json<AccessToken>, ApiError> {
    let user = match state.store.find_user_by_email(&request.email).await? {
        Some(user) if user.is_active => user,
        _ => return Err(ApiError::AuthenticationRequired),
    };
    if !auth::verify_password(request.password, user.password_hash.clone()).await {
        tracing::debug!(user_id = user.id, "token request with wrong password");
        return Err(ApiError::AuthenticationRequired);
    }
    Ok(Json(auth::issue_token(&user, &state.config.jwt)?))
}

// GET /api/user/me
async fn me(State(state): State<Arc<AppState>>, user: AuthUser) -> Result<Json<User>, ApiError> {
    let user = state
        .store
        .find_user(user.user_id)
        .await?
        .ok_or(ApiError::AuthenticationRequired)?;
    Ok(Json(user))
}
