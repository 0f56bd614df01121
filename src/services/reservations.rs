//! Reservation engine.
//!
//! A booking is validated and written inside one store transaction:
//! every ticket request is checked (performance exists, seat inside the hall,
//! seat free), then the reservation and all its tickets are inserted and
//! committed together. Any failure drops the transaction, so nothing is
//! persisted. The storage uniqueness constraint on (performance, row, seat)
//! is the final arbiter between concurrent bookings; the pre-check only
//! produces the friendly error for the common case.

use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use super::seats::{OutOfBounds, SeatMap};
use crate::error::ApiError;
use crate::models::{Reservation, ReservationRecord, Ticket, TicketRequest};
use crate::store::{
    BookingTx, PageRequest, Paged, Store, StoreError, SEAT_CONSTRAINT, TICKET_PERFORMANCE_FK,
};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("a reservation needs at least one ticket")]
    NoTickets,

    #[error("performance {0} not found")]
    PerformanceNotFound(i64),

    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),

    #[error("seat (row {row}, seat {seat}) is already taken for performance {performance}")]
    SeatTaken { performance: i64, row: i32, seat: i32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    fn seat_taken(request: &TicketRequest) -> Self {
        BookingError::SeatTaken {
            performance: request.performance,
            row: request.row,
            seat: request.seat,
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NoTickets => ApiError::validation("tickets: at least one ticket is required"),
            BookingError::PerformanceNotFound(id) => ApiError::not_found("performance", id),
            BookingError::OutOfBounds(e) => ApiError::OutOfBounds {
                row: e.row,
                seat: e.seat,
                rows: e.rows,
                seats_in_row: e.seats_in_row,
            },
            BookingError::SeatTaken { performance, row, seat } => {
                ApiError::SeatTaken { performance, row, seat }
            }
            BookingError::Store(e) => ApiError::internal(e),
        }
    }
}

/// A committed reservation with the tickets created for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub reservation: Reservation,
    pub tickets: Vec<Ticket>,
}

#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn Store>,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, user_id: i64, requests: &[TicketRequest]) -> Result<Booking, BookingError> {
        if requests.is_empty() {
            return Err(BookingError::NoTickets);
        }
        let tx = self.store.begin_booking().await?;
        book(tx, user_id, requests).await
    }

    pub async fn list(&self, user_id: i64, page: PageRequest) -> Result<Paged<ReservationRecord>, StoreError> {
        self.store.list_reservations(user_id, page).await
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<Option<ReservationRecord>, StoreError> {
        self.store.get_reservation(user_id, id).await
    }

    /// Removes the reservation and, with it, its tickets.
    pub async fn cancel(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let removed = self.store.delete_reservation(user_id, id).await?;
        if removed {
            info!(user_id, reservation_id = id, "reservation deleted");
        }
        Ok(removed)
    }
}

/// Validates and writes one booking inside an already opened transaction.
async fn book(
    mut tx: Box<dyn BookingTx>,
    user_id: i64,
    requests: &[TicketRequest],
) -> Result<Booking, BookingError> {
    let mut seat_maps: HashMap<i64, SeatMap> = HashMap::new();
    let mut requested: HashSet<(i64, i32, i32)> = HashSet::with_capacity(requests.len());

    // ошибки отдаём в порядке запроса
    for request in requests {
        let seat_map = match seat_maps.entry(request.performance) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let hall = tx
                    .performance_hall(request.performance)
                    .await?
                    .ok_or(BookingError::PerformanceNotFound(request.performance))?;
                *e.insert(SeatMap::from(&hall))
            }
        };

        seat_map.check(request.row, request.seat)?;

        let duplicate_in_request = !requested.insert((request.performance, request.row, request.seat));
        if duplicate_in_request || tx.seat_taken(request.performance, request.row, request.seat).await? {
            warn!(
                user_id,
                performance_id = request.performance,
                row = request.row,
                seat = request.seat,
                "seat already taken"
            );
            return Err(BookingError::seat_taken(request));
        }
    }

    // Вставляем в едином порядке мест, иначе встречные брони ловят deadlock на индексе
    let mut ordered: Vec<&TicketRequest> = requests.iter().collect();
    ordered.sort_by_key(|r| (r.performance, r.row, r.seat));

    let reservation = tx.insert_reservation(user_id).await?;
    let mut tickets = Vec::with_capacity(ordered.len());
    for request in ordered {
        let ticket = tx
            .insert_ticket(reservation.id, request)
            .await
            .map_err(|e| insert_failure(user_id, request, e))?;
        tickets.push(ticket);
    }
    tx.commit().await?;

    info!(
        user_id,
        reservation_id = reservation.id,
        tickets = tickets.len(),
        "reservation created"
    );
    Ok(Booking { reservation, tickets })
}

/// Classifies a failed ticket insert. Seat races and aborted transactions
/// mean another booking won the seat.
fn insert_failure(user_id: i64, request: &TicketRequest, err: StoreError) -> BookingError {
    match err {
        StoreError::UniqueViolation(ref c) if c == SEAT_CONSTRAINT => {
            warn!(
                user_id,
                performance_id = request.performance,
                row = request.row,
                seat = request.seat,
                "seat claimed by a concurrent booking"
            );
            BookingError::seat_taken(request)
        }
        StoreError::Conflict(reason) => {
            warn!(
                user_id,
                performance_id = request.performance,
                row = request.row,
                seat = request.seat,
                %reason,
                "booking aborted by a concurrent booking"
            );
            BookingError::seat_taken(request)
        }
        StoreError::ForeignKeyViolation(ref c) if c == TICKET_PERFORMANCE_FK => {
            BookingError::PerformanceNotFound(request.performance)
        }
        other => BookingError::Store(other),
    }
}
