use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::plays::PlayResponse;
use super::theatre_halls::HallResponse;
use super::{Page, PageParams, Representation};
use crate::error::ApiError;
use crate::extract::{ApiQuery, ValidJson};
use crate::middleware::{AuthUser, StaffUser};
use crate::models::{
    show_time, Performance, PerformanceInput, PerformanceRecord, PerformanceSummary, SeatPosition,
};
use crate::store::PerformanceFilter;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/performances", get(list_performances).post(create_performance))
        .route(
            "/performances/{id}",
            get(get_performance)
                .put(update_performance)
                .patch(patch_performance)
                .delete(delete_performance),
        )
}

/// Flat listing row, also embedded in reservation listings.
#[derive(Debug, Serialize)]
pub struct PerformanceListItem {
    pub id: i64,
    pub play_title: String,
    pub theatre_hall_name: String,
    pub theatre_hall_capacity: i64,
    pub show_time: NaiveDateTime,
    pub tickets_available: i64,
}

impl From<&PerformanceSummary> for PerformanceListItem {
    fn from(summary: &PerformanceSummary) -> Self {
        PerformanceListItem {
            id: summary.id,
            play_title: summary.play.title.clone(),
            theatre_hall_name: summary.theatre_hall.name.clone(),
            theatre_hall_capacity: summary.theatre_hall.capacity(),
            show_time: summary.show_time,
            tickets_available: summary.tickets_available(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PerformanceDetail {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub play: PlayResponse,
    pub theatre_hall: HallResponse,
    pub taken_places: Vec<SeatPosition>,
}

impl From<&PerformanceRecord> for PerformanceDetail {
    fn from(record: &PerformanceRecord) -> Self {
        PerformanceDetail {
            id: record.id,
            show_time: record.show_time,
            play: PlayResponse::build(&record.play, Representation::Detail),
            theatre_hall: HallResponse::from(&record.theatre_hall),
            taken_places: record.taken_places.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PerformanceWrite {
    pub id: i64,
    pub play: i64,
    pub theatre_hall: i64,
    pub show_time: NaiveDateTime,
}

impl From<&Performance> for PerformanceWrite {
    fn from(performance: &Performance) -> Self {
        PerformanceWrite {
            id: performance.id,
            play: performance.play_id,
            theatre_hall: performance.theatre_hall_id,
            show_time: performance.show_time,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PerformanceQuery {
    play: Option<String>,
    date: Option<NaiveDate>,
    page: Option<u32>,
    #[serde(alias = "pageSize")]
    page_size: Option<u32>,
}

impl PerformanceQuery {
    fn filter(&self) -> PerformanceFilter {
        PerformanceFilter {
            play_title: self
                .play
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            date: self.date,
        }
    }

    fn page(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct PerformancePatch {
    play: Option<i64>,
    theatre_hall: Option<i64>,
    #[serde(default, deserialize_with = "show_time::deserialize_option")]
    show_time: Option<NaiveDateTime>,
}

async fn list_performances(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<PerformanceQuery>,
) -> Result<Json<Page<PerformanceListItem>>, ApiError> {
    let page = query.page().resolve(&state.config.pagination);
    let performances = state.store.list_performances(&query.filter(), page).await?;
    Ok(Json(Page::new(performances, page, |p| {
        PerformanceListItem::from(&p)
    })))
}

async fn get_performance(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PerformanceDetail>, ApiError> {
    let performance = state
        .store
        .get_performance(id)
        .await?
        .ok_or_else(|| ApiError::not_found("performance", id))?;
    Ok(Json(PerformanceDetail::from(&performance)))
}

async fn create_performance(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    ValidJson(input): ValidJson<PerformanceInput>,
) -> Result<impl IntoResponse, ApiError> {
    let performance = state.store.create_performance(input).await?;
    tracing::info!(
        performance_id = performance.id,
        play_id = performance.play_id,
        hall_id = performance.theatre_hall_id,
        "performance scheduled"
    );
    Ok((StatusCode::CREATED, Json(PerformanceWrite::from(&performance))))
}

async fn update_performance(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<PerformanceInput>,
) -> Result<Json<PerformanceWrite>, ApiError> {
    let performance = state
        .store
        .update_performance(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("performance", id))?;
    Ok(Json(PerformanceWrite::from(&performance)))
}

async fn patch_performance(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(patch): ValidJson<PerformancePatch>,
) -> Result<Json<PerformanceWrite>, ApiError> {
    let current = state
        .store
        .get_performance(id)
        .await?
        .ok_or_else(|| ApiError::not_found("performance", id))?;
    let input = PerformanceInput {
        play: patch.play.unwrap_or(current.play.play.id),
        theatre_hall: patch.theatre_hall.unwrap_or(current.theatre_hall.id),
        show_time: patch.show_time.unwrap_or(current.show_time),
    };
    let performance = state
        .store
        .update_performance(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("performance", id))?;
    Ok(Json(PerformanceWrite::from(&performance)))
}

async fn delete_performance(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_performance(id).await? {
        return Err(ApiError::not_found("performance", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_filter_is_ignored() {
        let query = PerformanceQuery {
            play: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(query.filter().play_title, None);

        let query = PerformanceQuery {
            play: Some(" ham ".into()),
            ..Default::default()
        };
        assert_eq!(query.filter().play_title.as_deref(), Some("ham"));
    }
}
