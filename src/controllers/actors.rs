use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::{Page, PageParams};
use crate::error::ApiError;
use crate::extract::{ApiQuery, ValidJson};
use crate::middleware::{AuthUser, StaffUser};
use crate::models::{Actor, ActorInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/actors", get(list_actors).post(create_actor))
        .route(
            "/actors/{id}",
            get(get_actor)
                .put(update_actor)
                .patch(patch_actor)
                .delete(delete_actor),
        )
}

#[derive(Debug, Serialize)]
pub struct ActorResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<&Actor> for ActorResponse {
    fn from(actor: &Actor) -> Self {
        ActorResponse {
            id: actor.id,
            first_name: actor.first_name.clone(),
            last_name: actor.last_name.clone(),
            full_name: actor.full_name(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct ActorPatch {
    #[validate(length(min = 1, max = 255))]
    first_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    last_name: Option<String>,
}

async fn list_actors(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<ActorResponse>>, ApiError> {
    let page = params.resolve(&state.config.pagination);
    let actors = state.store.list_actors(page).await?;
    Ok(Json(Page::new(actors, page, |a| ActorResponse::from(&a))))
}

async fn get_actor(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ActorResponse>, ApiError> {
    let actor = state
        .store
        .get_actor(id)
        .await?
        .ok_or_else(|| ApiError::not_found("actor", id))?;
    Ok(Json(ActorResponse::from(&actor)))
}

async fn create_actor(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    ValidJson(input): ValidJson<ActorInput>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.store.create_actor(input).await?;
    Ok((StatusCode::CREATED, Json(ActorResponse::from(&actor))))
}

async fn update_actor(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<ActorInput>,
) -> Result<Json<ActorResponse>, ApiError> {
    let actor = state
        .store
        .update_actor(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("actor", id))?;
    Ok(Json(ActorResponse::from(&actor)))
}

async fn patch_actor(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(patch): ValidJson<ActorPatch>,
) -> Result<Json<ActorResponse>, ApiError> {
    let current = state
        .store
        .get_actor(id)
        .await?
        .ok_or_else(|| ApiError::not_found("actor", id))?;
    let input = ActorInput {
        first_name: patch.first_name.unwrap_or(current.first_name),
        last_name: patch.last_name.unwrap_or(current.last_name),
    };
    let actor = state
        .store
        .update_actor(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("actor", id))?;
    Ok(Json(ActorResponse::from(&actor)))
}

async fn delete_actor(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_actor(id).await? {
        return Err(ApiError::not_found("actor", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
