//! In-process store for local runs and tests.
//!
//! All tables sit behind one async mutex. A booking holds the owned guard for
//! its whole lifetime, so concurrent bookings are serialized and see each
//! other's committed tickets.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    BookingTx, PageRequest, Paged, PerformanceFilter, PlayFilter, Store, StoreError, StoreResult,
    SEAT_CONSTRAINT, TICKET_PERFORMANCE_FK,
};
use crate::models::{
    Actor, ActorInput, Genre, GenreInput, NewUser, Performance, PerformanceInput,
    PerformanceRecord, PerformanceSummary, Play, PlayInput, PlayRecord, Reservation,
    ReservationRecord, SeatPosition, TheatreHall, TheatreHallInput, Ticket, TicketRecord,
    TicketRequest, User,
};

#[derive(Debug, Default)]
struct Tables {
    sequences: BTreeMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    genres: BTreeMap<i64, Genre>,
    actors: BTreeMap<i64, Actor>,
    halls: BTreeMap<i64, TheatreHall>,
    plays: BTreeMap<i64, Play>,
    play_genres: BTreeSet<(i64, i64)>,
    play_actors: BTreeSet<(i64, i64)>,
    performances: BTreeMap<i64, Performance>,
    reservations: BTreeMap<i64, Reservation>,
    tickets: BTreeMap<i64, Ticket>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    fn play_record(&self, play: &Play) -> PlayRecord {
        let genres = self
            .play_genres
            .range((play.id, i64::MIN)..=(play.id, i64::MAX))
            .filter_map(|(_, genre_id)| self.genres.get(genre_id).cloned())
            .collect();
        let actors = self
            .play_actors
            .range((play.id, i64::MIN)..=(play.id, i64::MAX))
            .filter_map(|(_, actor_id)| self.actors.get(actor_id).cloned())
            .collect();
        PlayRecord {
            play: play.clone(),
            genres,
            actors,
        }
    }

    fn tickets_for(&self, performance_id: i64) -> impl Iterator<Item = &Ticket> {
        self.tickets
            .values()
            .filter(move |t| t.performance_id == performance_id)
    }

    fn summary(&self, performance: &Performance) -> Option<PerformanceSummary> {
        Some(PerformanceSummary {
            id: performance.id,
            show_time: performance.show_time,
            play: self.plays.get(&performance.play_id)?.clone(),
            theatre_hall: self.halls.get(&performance.theatre_hall_id)?.clone(),
            tickets_taken: self.tickets_for(performance.id).count() as i64,
        })
    }

    fn reservation_record(&self, reservation: &Reservation) -> ReservationRecord {
        let tickets = self
            .tickets
            .values()
            .filter(|t| t.reservation_id == reservation.id)
            .filter_map(|ticket| {
                let performance = self.performances.get(&ticket.performance_id)?;
                Some(TicketRecord {
                    ticket: ticket.clone(),
                    performance: self.summary(performance)?,
                })
            })
            .collect();
        ReservationRecord {
            reservation: reservation.clone(),
            tickets,
        }
    }

    fn ensure_genre_name_free(&self, name: &str, except: Option<i64>) -> StoreResult<()> {
        let taken = self
            .genres
            .values()
            .any(|g| g.name == name && Some(g.id) != except);
        if taken {
            return Err(StoreError::UniqueViolation("genres_name_key".into()));
        }
        Ok(())
    }

    fn replace_play_relations(&mut self, play_id: i64, input: &PlayInput) -> StoreResult<()> {
        let (genres, actors) = input.relation_sets();
        if let Some(missing) = genres.iter().find(|id| !self.genres.contains_key(*id)) {
            return Err(StoreError::ForeignKeyViolation(format!("genre {missing}")));
        }
        if let Some(missing) = actors.iter().find(|id| !self.actors.contains_key(*id)) {
            return Err(StoreError::ForeignKeyViolation(format!("actor {missing}")));
        }
        self.play_genres.retain(|(p, _)| *p != play_id);
        self.play_actors.retain(|(p, _)| *p != play_id);
        self.play_genres.extend(genres.into_iter().map(|g| (play_id, g)));
        self.play_actors.extend(actors.into_iter().map(|a| (play_id, a)));
        Ok(())
    }

    fn ensure_performance_refs(&self, input: &PerformanceInput) -> StoreResult<()> {
        if !self.plays.contains_key(&input.play) {
            return Err(StoreError::ForeignKeyViolation(format!("play {}", input.play)));
        }
        if !self.halls.contains_key(&input.theatre_hall) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "theatre hall {}",
                input.theatre_hall
            )));
        }
        Ok(())
    }

    fn remove_performances_where(&mut self, pred: impl Fn(&Performance) -> bool) {
        let doomed: Vec<i64> = self
            .performances
            .values()
            .filter(|&p| pred(p))
            .map(|p| p.id)
            .collect();
        for id in doomed {
            self.performances.remove(&id);
            self.tickets.retain(|_, t| t.performance_id != id);
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        let email = NewUser::normalized_email(&user.email);
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let id = tables.next_id("users");
        let created = User {
            id,
            email,
            password_hash: user.password_hash,
            is_staff: user.is_staff,
            is_active: true,
            date_joined: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = NewUser::normalized_email(email);
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_genres(&self, page: PageRequest) -> StoreResult<Paged<Genre>> {
        let tables = self.tables.lock().await;
        Ok(page.slice(tables.genres.values().cloned().collect()))
    }

    async fn get_genre(&self, id: i64) -> StoreResult<Option<Genre>> {
        Ok(self.tables.lock().await.genres.get(&id).cloned())
    }

    async fn create_genre(&self, input: GenreInput) -> StoreResult<Genre> {
        let mut tables = self.tables.lock().await;
        tables.ensure_genre_name_free(&input.name, None)?;
        let id = tables.next_id("genres");
        let genre = Genre { id, name: input.name };
        tables.genres.insert(id, genre.clone());
        Ok(genre)
    }

    async fn update_genre(&self, id: i64, input: GenreInput) -> StoreResult<Option<Genre>> {
        let mut tables = self.tables.lock().await;
        if !tables.genres.contains_key(&id) {
            return Ok(None);
        }
        tables.ensure_genre_name_free(&input.name, Some(id))?;
        let genre = Genre { id, name: input.name };
        tables.genres.insert(id, genre.clone());
        Ok(Some(genre))
    }

    async fn delete_genre(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let removed = tables.genres.remove(&id).is_some();
        tables.play_genres.retain(|(_, g)| *g != id);
        Ok(removed)
    }

    async fn list_actors(&self, page: PageRequest) -> StoreResult<Paged<Actor>> {
        let tables = self.tables.lock().await;
        Ok(page.slice(tables.actors.values().cloned().collect()))
    }

    async fn get_actor(&self, id: i64) -> StoreResult<Option<Actor>> {
        Ok(self.tables.lock().await.actors.get(&id).cloned())
    }

    async fn create_actor(&self, input: ActorInput) -> StoreResult<Actor> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id("actors");
        let actor = Actor {
            id,
            first_name: input.first_name,
            last_name: input.last_name,
        };
        tables.actors.insert(id, actor.clone());
        Ok(actor)
    }

    async fn update_actor(&self, id: i64, input: ActorInput) -> StoreResult<Option<Actor>> {
        let mut tables = self.tables.lock().await;
        let Some(actor) = tables.actors.get_mut(&id) else {
            return Ok(None);
        };
        actor.first_name = input.first_name;
        actor.last_name = input.last_name;
        Ok(Some(actor.clone()))
    }

    async fn delete_actor(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let removed = tables.actors.remove(&id).is_some();
        tables.play_actors.retain(|(_, a)| *a != id);
        Ok(removed)
    }

    async fn list_halls(&self, page: PageRequest) -> StoreResult<Paged<TheatreHall>> {
        let tables = self.tables.lock().await;
        Ok(page.slice(tables.halls.values().cloned().collect()))
    }

    async fn get_hall(&self, id: i64) -> StoreResult<Option<TheatreHall>> {
        Ok(self.tables.lock().await.halls.get(&id).cloned())
    }

    async fn create_hall(&self, input: TheatreHallInput) -> StoreResult<TheatreHall> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id("theatre_halls");
        let hall = TheatreHall {
            id,
            name: input.name,
            rows: input.rows,
            seats_in_row: input.seats_in_row,
        };
        tables.halls.insert(id, hall.clone());
        Ok(hall)
    }

    async fn update_hall(
        &self,
        id: i64,
        input: TheatreHallInput,
    ) -> StoreResult<Option<TheatreHall>> {
        let mut tables = self.tables.lock().await;
        let Some(hall) = tables.halls.get_mut(&id) else {
            return Ok(None);
        };
        hall.name = input.name;
        hall.rows = input.rows;
        hall.seats_in_row = input.seats_in_row;
        Ok(Some(hall.clone()))
    }

    async fn delete_hall(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let removed = tables.halls.remove(&id).is_some();
        tables.remove_performances_where(|p| p.theatre_hall_id == id);
        Ok(removed)
    }

    async fn list_plays(
        &self,
        filter: &PlayFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<PlayRecord>> {
        let tables = self.tables.lock().await;
        let matching = tables
            .plays
            .values()
            .map(|play| tables.play_record(play))
            .filter(|record| filter.matches(&record.genre_ids(), &record.actor_ids()))
            .collect();
        Ok(page.slice(matching))
    }

    async fn get_play(&self, id: i64) -> StoreResult<Option<PlayRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.plays.get(&id).map(|play| tables.play_record(play)))
    }

    async fn create_play(&self, input: PlayInput) -> StoreResult<PlayRecord> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id("plays");
        tables.replace_play_relations(id, &input)?;
        let play = Play {
            id,
            title: input.title,
            description: input.description,
        };
        tables.plays.insert(id, play.clone());
        Ok(tables.play_record(&play))
    }

    async fn update_play(&self, id: i64, input: PlayInput) -> StoreResult<Option<PlayRecord>> {
        let mut tables = self.tables.lock().await;
        if !tables.plays.contains_key(&id) {
            return Ok(None);
        }
        tables.replace_play_relations(id, &input)?;
        let play = Play {
            id,
            title: input.title,
            description: input.description,
        };
        tables.plays.insert(id, play.clone());
        Ok(Some(tables.play_record(&play)))
    }

    async fn delete_play(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let removed = tables.plays.remove(&id).is_some();
        tables.play_genres.retain(|(p, _)| *p != id);
        tables.play_actors.retain(|(p, _)| *p != id);
        tables.remove_performances_where(|p| p.play_id == id);
        Ok(removed)
    }

    async fn list_performances(
        &self,
        filter: &PerformanceFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<PerformanceSummary>> {
        let tables = self.tables.lock().await;
        let needle = filter.play_title.as_ref().map(|t| t.to_lowercase());
        let mut matching: Vec<PerformanceSummary> = tables
            .performances
            .values()
            .filter(|p| filter.date.map_or(true, |d| p.show_time.date() == d))
            .filter_map(|p| tables.summary(p))
            .filter(|s| {
                needle
                    .as_deref()
                    .map_or(true, |n| s.play.title.to_lowercase().contains(n))
            })
            .collect();
        matching.sort_by_key(|s| (s.show_time, s.id));
        Ok(page.slice(matching))
    }

    async fn get_performance(&self, id: i64) -> StoreResult<Option<PerformanceRecord>> {
        let tables = self.tables.lock().await;
        let Some(performance) = tables.performances.get(&id) else {
            return Ok(None);
        };
        let (Some(play), Some(hall)) = (
            tables.plays.get(&performance.play_id),
            tables.halls.get(&performance.theatre_hall_id),
        ) else {
            return Ok(None);
        };
        let mut taken_places: Vec<SeatPosition> = tables
            .tickets_for(id)
            .map(|t| SeatPosition {
                row: t.row,
                seat: t.seat,
            })
            .collect();
        taken_places.sort();
        Ok(Some(PerformanceRecord {
            id,
            show_time: performance.show_time,
            play: tables.play_record(play),
            theatre_hall: hall.clone(),
            taken_places,
        }))
    }

    async fn create_performance(&self, input: PerformanceInput) -> StoreResult<Performance> {
        let mut tables = self.tables.lock().await;
        tables.ensure_performance_refs(&input)?;
        let id = tables.next_id("performances");
        let performance = Performance {
            id,
            play_id: input.play,
            theatre_hall_id: input.theatre_hall,
            show_time: input.show_time,
        };
        tables.performances.insert(id, performance.clone());
        Ok(performance)
    }

    async fn update_performance(
        &self,
        id: i64,
        input: PerformanceInput,
    ) -> StoreResult<Option<Performance>> {
        let mut tables = self.tables.lock().await;
        if !tables.performances.contains_key(&id) {
            return Ok(None);
        }
        tables.ensure_performance_refs(&input)?;
        let performance = Performance {
            id,
            play_id: input.play,
            theatre_hall_id: input.theatre_hall,
            show_time: input.show_time,
        };
        tables.performances.insert(id, performance.clone());
        Ok(Some(performance))
    }

    async fn delete_performance(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let removed = tables.performances.contains_key(&id);
        tables.remove_performances_where(|p| p.id == id);
        Ok(removed)
    }

    async fn list_reservations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> StoreResult<Paged<ReservationRecord>> {
        let tables = self.tables.lock().await;
        let owned = tables
            .reservations
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .map(|r| tables.reservation_record(r))
            .collect();
        Ok(page.slice(owned))
    }

    async fn get_reservation(
        &self,
        user_id: i64,
        id: i64,
    ) -> StoreResult<Option<ReservationRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reservations
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .map(|r| tables.reservation_record(r)))
    }

    async fn delete_reservation(&self, user_id: i64, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .reservations
            .get(&id)
            .is_some_and(|r| r.user_id == user_id);
        if owned {
            tables.reservations.remove(&id);
            tables.tickets.retain(|_, t| t.reservation_id != id);
        }
        Ok(owned)
    }

    async fn begin_booking(&self) -> StoreResult<Box<dyn BookingTx>> {
        let tables = self.tables.clone().lock_owned().await;
        Ok(Box::new(MemoryBookingTx {
            tables,
            reservation: None,
            tickets: Vec::new(),
        }))
    }
}

/// Staged booking; nothing reaches the tables until `commit`.
struct MemoryBookingTx {
    tables: OwnedMutexGuard<Tables>,
    reservation: Option<Reservation>,
    tickets: Vec<Ticket>,
}

impl MemoryBookingTx {
    fn occupied(&self, performance_id: i64, row: i32, seat: i32) -> bool {
        let same = |t: &Ticket| t.performance_id == performance_id && t.row == row && t.seat == seat;
        self.tables.tickets.values().any(same) || self.tickets.iter().any(same)
    }
}

#[async_trait]
impl BookingTx for MemoryBookingTx {
    async fn performance_hall(&mut self, performance_id: i64) -> StoreResult<Option<TheatreHall>> {
        Ok(self
            .tables
            .performances
            .get(&performance_id)
            .and_then(|p| self.tables.halls.get(&p.theatre_hall_id))
            .cloned())
    }

    async fn seat_taken(&mut self, performance_id: i64, row: i32, seat: i32) -> StoreResult<bool> {
        Ok(self.occupied(performance_id, row, seat))
    }

    async fn insert_reservation(&mut self, user_id: i64) -> StoreResult<Reservation> {
        if !self.tables.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKeyViolation(format!("user {user_id}")));
        }
        let reservation = Reservation {
            id: self.tables.next_id("reservations"),
            user_id,
            created_at: Utc::now(),
        };
        self.reservation = Some(reservation.clone());
        Ok(reservation)
    }

    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        request: &TicketRequest,
    ) -> StoreResult<Ticket> {
        if self.reservation.as_ref().map(|r| r.id) != Some(reservation_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "reservation {reservation_id}"
            )));
        }
        if !self.tables.performances.contains_key(&request.performance) {
            return Err(StoreError::ForeignKeyViolation(TICKET_PERFORMANCE_FK.into()));
        }
        if self.occupied(request.performance, request.row, request.seat) {
            return Err(StoreError::UniqueViolation(SEAT_CONSTRAINT.into()));
        }
        let ticket = Ticket {
            id: self.tables.next_id("tickets"),
            row: request.row,
            seat: request.seat,
            performance_id: request.performance,
            reservation_id,
        };
        self.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryBookingTx {
            mut tables,
            reservation,
            tickets,
        } = *self;
        if let Some(reservation) = reservation {
            tables.reservations.insert(reservation.id, reservation);
        }
        for ticket in tickets {
            tables.tickets.insert(ticket.id, ticket);
        }
        Ok(())
    }
}
