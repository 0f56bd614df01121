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
use crate::models::{TheatreHall, TheatreHallInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/theatre-halls", get(list_halls).post(create_hall))
        .route(
            "/theatre-halls/{id}",
            get(get_hall)
                .put(update_hall)
                .patch(patch_hall)
                .delete(delete_hall),
        )
}

#[derive(Debug, Serialize)]
pub struct HallResponse {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<&TheatreHall> for HallResponse {
    fn from(hall: &TheatreHall) -> Self {
        HallResponse {
            id: hall.id,
            name: hall.name.clone(),
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
            capacity: hall.capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct HallPatch {
    #[validate(length(min = 1, max = 255))]
    name: Option<String>,
    #[validate(range(min = 1))]
    rows: Option<i32>,
    #[validate(range(min = 1))]
    seats_in_row: Option<i32>,
}

async fn list_halls(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<HallResponse>>, ApiError> {
    let page = params.resolve(&state.config.pagination);
    let halls = state.store.list_halls(page).await?;
    Ok(Json(Page::new(halls, page, |h| HallResponse::from(&h))))
}

async fn get_hall(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<HallResponse>, ApiError> {
    let hall = state
        .store
        .get_hall(id)
        .await?
        .ok_or_else(|| ApiError::not_found("theatre hall", id))?;
    Ok(Json(HallResponse::from(&hall)))
}

async fn create_hall(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    ValidJson(input): ValidJson<TheatreHallInput>,
) -> Result<impl IntoResponse, ApiError> {
    let hall = state.store.create_hall(input).await?;
    tracing::info!(hall_id = hall.id, capacity = hall.capacity(), "theatre hall created");
    Ok((StatusCode::CREATED, Json(HallResponse::from(&hall))))
}

async fn update_hall(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<TheatreHallInput>,
) -> Result<Json<HallResponse>, ApiError> {
    let hall = state
        .store
        .update_hall(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("theatre hall", id))?;
    Ok(Json(HallResponse::from(&hall)))
}

async fn patch_hall(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(patch): ValidJson<HallPatch>,
) -> Result<Json<HallResponse>, ApiError> {
    let current = state
        .store
        .get_hall(id)
        .await?
        .ok_or_else(|| ApiError::not_found("theatre hall", id))?;
    let input = TheatreHallInput {
        name: patch.name.unwrap_or(current.name),
        rows: patch.rows.unwrap_or(current.rows),
        seats_in_row: patch.seats_in_row.unwrap_or(current.seats_in_row),
    };
    let hall = state
        .store
        .update_hall(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("theatre hall", id))?;
    Ok(Json(HallResponse::from(&hall)))
}

async fn delete_hall(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_hall(id).await? {
        return Err(ApiError::not_found("theatre hall", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
