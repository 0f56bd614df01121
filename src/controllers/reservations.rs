use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::performances::PerformanceListItem;
use super::theatre_halls::HallResponse;
use super::{Page, PageParams, Representation};
use crate::error::ApiError;
use crate::extract::{ApiQuery, ValidJson};
use crate::middleware::AuthUser;
use crate::models::{Play, ReservationRecord, Ticket, TicketRecord, TicketRequest};
use crate::services::reservations::Booking;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reservations", get(list_reservations).post(create_reservation))
        .route(
            "/reservations/{id}",
            get(get_reservation).delete(delete_reservation),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReservationRequest {
    #[validate(length(min = 1, message = "at least one ticket is required"))]
    pub tickets: Vec<TicketRequest>,
}

#[derive(Debug, Serialize)]
pub struct PerformanceRef {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub play: Play,
    pub theatre_hall: HallResponse,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TicketResponse {
    List {
        id: i64,
        row: i32,
        seat: i32,
        performance: PerformanceListItem,
    },
    Detail {
        id: i64,
        row: i32,
        seat: i32,
        performance: PerformanceRef,
    },
    Write {
        id: i64,
        row: i32,
        seat: i32,
        performance: i64,
    },
}

impl TicketResponse {
    fn build(record: &TicketRecord, representation: Representation) -> Self {
        let ticket = &record.ticket;
        let summary = &record.performance;
        match representation {
            Representation::List => TicketResponse::List {
                id: ticket.id,
                row: ticket.row,
                seat: ticket.seat,
                performance: PerformanceListItem::from(summary),
            },
            Representation::Detail => TicketResponse::Detail {
                id: ticket.id,
                row: ticket.row,
                seat: ticket.seat,
                performance: PerformanceRef {
                    id: summary.id,
                    show_time: summary.show_time,
                    play: summary.play.clone(),
                    theatre_hall: HallResponse::from(&summary.theatre_hall),
                },
            },
            Representation::Write => TicketResponse::from(ticket),
        }
    }
}

impl From<&Ticket> for TicketResponse {
    fn from(ticket: &Ticket) -> Self {
        TicketResponse::Write {
            id: ticket.id,
            row: ticket.row,
            seat: ticket.seat,
            performance: ticket.performance_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketResponse>,
}

impl ReservationResponse {
    pub fn build(record: &ReservationRecord, representation: Representation) -> Self {
        ReservationResponse {
            id: record.reservation.id,
            created_at: record.reservation.created_at,
            tickets: record
                .tickets
                .iter()
                .map(|t| TicketResponse::build(t, representation))
                .collect(),
        }
    }
}

impl From<&Booking> for ReservationResponse {
    fn from(booking: &Booking) -> Self {
        ReservationResponse {
            id: booking.reservation.id,
            created_at: booking.reservation.created_at,
            tickets: booking.tickets.iter().map(TicketResponse::from).collect(),
        }
    }
}

// GET /api/reservations
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<ReservationResponse>>, ApiError> {
    let page = params.resolve(&state.config.pagination);
    let reservations = state.reservations.list(user.user_id, page).await?;
    Ok(Json(Page::new(reservations, page, |r| {
        ReservationResponse::build(&r, Representation::List)
    })))
}

// GET /api/reservations/{id}
async fn get_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = state
        .reservations
        .get(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("reservation", id))?;
    Ok(Json(ReservationResponse::build(
        &reservation,
        Representation::Detail,
    )))
}

// POST /api/reservations
async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(request): ValidJson<ReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .reservations
        .create(user.user_id, &request.tickets)
        .await?;
    Ok((StatusCode::CREATED, Json(ReservationResponse::from(&booking))))
}

// DELETE /api/reservations/{id}
async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    // чужая бронь выглядит так же, как несуществующая
    if !state.reservations.cancel(user.user_id, id).await? {
        return Err(ApiError::not_found("reservation", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_needs_at_least_one_ticket() {
        let empty: ReservationRequest = serde_json::from_value(json!({ "tickets": [] })).unwrap();
        assert!(empty.validate().is_err());

        let one: ReservationRequest = serde_json::from_value(json!({
            "tickets": [{ "performance": 1, "row": 2, "seat": 3 }]
        }))
        .unwrap();
        assert!(one.validate().is_ok());
        assert_eq!(
            one.tickets,
            vec![TicketRequest {
                performance: 1,
                row: 2,
                seat: 3
            }]
        );
    }
}
