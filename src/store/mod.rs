//! Persistence boundary.
//!
//! Handlers and the reservation engine only ever talk to [`Store`]. Booking
//! writes go through a [`BookingTx`], a scoped transaction handle: it must be
//! committed explicitly and is rolled back when dropped.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{
    Actor, ActorInput, Genre, GenreInput, NewUser, Performance, PerformanceInput,
    PerformanceRecord, PerformanceSummary, PlayInput, PlayRecord, Reservation, ReservationRecord,
    TheatreHall, TheatreHallInput, Ticket, TicketRequest, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the constraint name.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    /// A write referenced a row that does not exist.
    #[error("referenced record does not exist: {0}")]
    ForeignKeyViolation(String),
    /// The database aborted the transaction (deadlock or serialization failure).
    #[error("transaction aborted by a concurrent writer: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Database(sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                return StoreError::UniqueViolation(constraint);
            }
            if db.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(constraint);
            }
            // 40P01 deadlock_detected, 40001 serialization_failure
            if matches!(db.code().as_deref(), Some("40P01") | Some("40001")) {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Name of the constraint guarding one ticket per seat per performance.
pub const SEAT_CONSTRAINT: &str = "tickets_performance_seat_key";

/// Foreign key from a ticket to its performance.
pub const TICKET_PERFORMANCE_FK: &str = "tickets_performance_id_fkey";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    /// Cuts one page out of an already ordered, fully materialized list.
    pub fn slice<T>(&self, items: Vec<T>) -> Paged<T> {
        let count = items.len() as i64;
        let items = items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.page_size as usize)
            .collect();
        Paged { count, items }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    /// Total number of matching records, across all pages.
    pub count: i64,
    pub items: Vec<T>,
}

/// Set-membership filter for plays. `None` means the filter is not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayFilter {
    pub genres: Option<Vec<i64>>,
    pub actors: Option<Vec<i64>>,
}

impl PlayFilter {
    pub fn matches(&self, genre_ids: &[i64], actor_ids: &[i64]) -> bool {
        let intersects = |wanted: &Option<Vec<i64>>, have: &[i64]| match wanted {
            Some(wanted) => wanted.iter().any(|id| have.contains(id)),
            None => true,
        };
        intersects(&self.genres, genre_ids) && intersects(&self.actors, actor_ids)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformanceFilter {
    /// Case-insensitive substring of the play title.
    pub play_title: Option<String>,
    pub date: Option<NaiveDate>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // users
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    // genres
    async fn list_genres(&self, page: PageRequest) -> StoreResult<Paged<Genre>>;
    async fn get_genre(&self, id: i64) -> StoreResult<Option<Genre>>;
    async fn create_genre(&self, input: GenreInput) -> StoreResult<Genre>;
    async fn update_genre(&self, id: i64, input: GenreInput) -> StoreResult<Option<Genre>>;
    async fn delete_genre(&self, id: i64) -> StoreResult<bool>;

    // actors
    async fn list_actors(&self, page: PageRequest) -> StoreResult<Paged<Actor>>;
    async fn get_actor(&self, id: i64) -> StoreResult<Option<Actor>>;
    async fn create_actor(&self, input: ActorInput) -> StoreResult<Actor>;
    async fn update_actor(&self, id: i64, input: ActorInput) -> StoreResult<Option<Actor>>;
    async fn delete_actor(&self, id: i64) -> StoreResult<bool>;

    // theatre halls
    async fn list_halls(&self, page: PageRequest) -> StoreResult<Paged<TheatreHall>>;
    async fn get_hall(&self, id: i64) -> StoreResult<Option<TheatreHall>>;
    async fn create_hall(&self, input: TheatreHallInput) -> StoreResult<TheatreHall>;
    async fn update_hall(&self, id: i64, input: TheatreHallInput)
        -> StoreResult<Option<TheatreHall>>;
    async fn delete_hall(&self, id: i64) -> StoreResult<bool>;

    // plays
    async fn list_plays(&self, filter: &PlayFilter, page: PageRequest)
        -> StoreResult<Paged<PlayRecord>>;
    async fn get_play(&self, id: i64) -> StoreResult<Option<PlayRecord>>;
    async fn create_play(&self, input: PlayInput) -> StoreResult<PlayRecord>;
    async fn update_play(&self, id: i64, input: PlayInput) -> StoreResult<Option<PlayRecord>>;
    async fn delete_play(&self, id: i64) -> StoreResult<bool>;

    // performances
    async fn list_performances(
        &self,
        filter: &PerformanceFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<PerformanceSummary>>;
    async fn get_performance(&self, id: i64) -> StoreResult<Option<PerformanceRecord>>;
    async fn create_performance(&self, input: PerformanceInput) -> StoreResult<Performance>;
    async fn update_performance(
        &self,
        id: i64,
        input: PerformanceInput,
    ) -> StoreResult<Option<Performance>>;
    async fn delete_performance(&self, id: i64) -> StoreResult<bool>;

    // reservations, всегда в рамках владельца
    async fn list_reservations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> StoreResult<Paged<ReservationRecord>>;
    async fn get_reservation(&self, user_id: i64, id: i64)
        -> StoreResult<Option<ReservationRecord>>;
    async fn delete_reservation(&self, user_id: i64, id: i64) -> StoreResult<bool>;

    /// Opens the transaction a booking runs in.
    async fn begin_booking(&self) -> StoreResult<Box<dyn BookingTx>>;
}

/// Write side of a single booking. Dropping it without [`BookingTx::commit`]
/// discards everything it staged.
#[async_trait]
pub trait BookingTx: Send {
    /// Hall of the performance, or `None` when the performance does not exist.
    async fn performance_hall(&mut self, performance_id: i64) -> StoreResult<Option<TheatreHall>>;

    async fn seat_taken(&mut self, performance_id: i64, row: i32, seat: i32) -> StoreResult<bool>;

    async fn insert_reservation(&mut self, user_id: i64) -> StoreResult<Reservation>;

    /// Fails with [`StoreError::UniqueViolation`] naming [`SEAT_CONSTRAINT`]
    /// when the seat is already claimed.
    async fn insert_ticket(&mut self, reservation_id: i64, request: &TicketRequest)
        -> StoreResult<Ticket>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
