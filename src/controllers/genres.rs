use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::{Page, PageParams};
use crate::error::ApiError;
use crate::extract::{ApiQuery, ValidJson};
use crate::middleware::{AuthUser, StaffUser};
use crate::models::{Genre, GenreInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/genres", get(list_genres).post(create_genre))
        .route(
            "/genres/{id}",
            get(get_genre)
                .put(update_genre)
                .patch(patch_genre)
                .delete(delete_genre),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct GenrePatch {
    #[validate(length(min = 1, max = 255))]
    name: Option<String>,
}

async fn list_genres(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<Genre>>, ApiError> {
    let page = params.resolve(&state.config.pagination);
    let genres = state.store.list_genres(page).await?;
    Ok(Json(Page::new(genres, page, |g| g)))
}

async fn get_genre(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Genre>, ApiError> {
    let genre = state
        .store
        .get_genre(id)
        .await?
        .ok_or_else(|| ApiError::not_found("genre", id))?;
    Ok(Json(genre))
}

async fn create_genre(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    ValidJson(input): ValidJson<GenreInput>,
) -> Result<impl IntoResponse, ApiError> {
    let genre = state.store.create_genre(input).await?;
    tracing::info!(genre_id = genre.id, by = user.user_id, "genre created");
    Ok((StatusCode::CREATED, Json(genre)))
}

async fn update_genre(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<GenreInput>,
) -> Result<Json<Genre>, ApiError> {
    let genre = state
        .store
        .update_genre(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("genre", id))?;
    Ok(Json(genre))
}

async fn patch_genre(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(patch): ValidJson<GenrePatch>,
) -> Result<Json<Genre>, ApiError> {
    let current = state
        .store
        .get_genre(id)
        .await?
        .ok_or_else(|| ApiError::not_found("genre", id))?;
    let input = GenreInput {
        name: patch.name.unwrap_or(current.name),
    };
    let genre = state
        .store
        .update_genre(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("genre", id))?;
    Ok(Json(genre))
}

async fn delete_genre(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_genre(id).await? {
        return Err(ApiError::not_found("genre", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
