use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, Postgres, Transaction};
use std::collections::HashMap;

use super::{
    BookingTx, PageRequest, Paged, PerformanceFilter, PlayFilter, Store, StoreResult,
};
use crate::database::Database;
use crate::models::{
    Actor, ActorInput, Genre, GenreInput, NewUser, Performance, PerformanceInput,
    PerformanceRecord, PerformanceSummary, Play, PlayInput, PlayRecord, Reservation,
    ReservationRecord, SeatPosition, TheatreHall, TheatreHallInput, Ticket, TicketRecord,
    TicketRequest, User,
};

// Общий список колонок для показов; `p`, `pl`, `h` из join'ов ниже.
macro_rules! summary_columns {
    () => {
        r#"
        p.id AS performance_id,
        p.show_time,
        pl.id AS play_id,
        pl.title AS play_title,
        pl.description AS play_description,
        h.id AS hall_id,
        h.name AS hall_name,
        h.rows AS hall_rows,
        h.seats_in_row AS hall_seats_in_row,
        (SELECT COUNT(*) FROM tickets tt WHERE tt.performance_id = p.id) AS tickets_taken
        "#
    };
}

macro_rules! performance_joins {
    () => {
        " JOIN plays pl ON pl.id = p.play_id JOIN theatre_halls h ON h.id = p.theatre_hall_id "
    };
}

macro_rules! performance_filter {
    () => {
        r#"
        WHERE ($1::TEXT IS NULL OR pl.title ILIKE '%' || $1 || '%')
          AND ($2::DATE IS NULL OR p.show_time::DATE = $2)
        "#
    };
}

macro_rules! play_filter {
    () => {
        r#"
        WHERE ($1::BIGINT[] IS NULL OR EXISTS (
                SELECT 1 FROM play_genres pg WHERE pg.play_id = pl.id AND pg.genre_id = ANY($1)))
          AND ($2::BIGINT[] IS NULL OR EXISTS (
                SELECT 1 FROM play_actors pa WHERE pa.play_id = pl.id AND pa.actor_id = ANY($2)))
        "#
    };
}

const USER_COLUMNS: &str = "id, email, password_hash, is_staff, is_active, date_joined";

#[derive(Debug, FromRow)]
struct PerformanceSummaryRow {
    performance_id: i64,
    show_time: chrono::NaiveDateTime,
    play_id: i64,
    play_title: String,
    play_description: String,
    hall_id: i64,
    hall_name: String,
    hall_rows: i32,
    hall_seats_in_row: i32,
    tickets_taken: i64,
}

impl From<PerformanceSummaryRow> for PerformanceSummary {
    fn from(row: PerformanceSummaryRow) -> Self {
        PerformanceSummary {
            id: row.performance_id,
            show_time: row.show_time,
            play: Play {
                id: row.play_id,
                title: row.play_title,
                description: row.play_description,
            },
            theatre_hall: TheatreHall {
                id: row.hall_id,
                name: row.hall_name,
                rows: row.hall_rows,
                seats_in_row: row.hall_seats_in_row,
            },
            tickets_taken: row.tickets_taken,
        }
    }
}

#[derive(Debug, FromRow)]
struct TicketSummaryRow {
    ticket_id: i64,
    row: i32,
    seat: i32,
    reservation_id: i64,
    #[sqlx(flatten)]
    performance: PerformanceSummaryRow,
}

#[derive(Debug, FromRow)]
struct PlayGenreRow {
    play_id: i64,
    id: i64,
    name: String,
}

#[derive(Debug, FromRow)]
struct PlayActorRow {
    play_id: i64,
    id: i64,
    first_name: String,
    last_name: String,
}

/// Escapes LIKE wildcards so the filter is a plain substring match.
fn like_fragment(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Resolves genre and actor sets for a batch of plays in two queries.
async fn attach_relations(conn: &mut PgConnection, plays: Vec<Play>) -> StoreResult<Vec<PlayRecord>> {
    let ids: Vec<i64> = plays.iter().map(|p| p.id).collect();

    let genre_rows: Vec<PlayGenreRow> = sqlx::query_as(
        "SELECT pg.play_id, g.id, g.name
         FROM play_genres pg
         JOIN genres g ON g.id = pg.genre_id
         WHERE pg.play_id = ANY($1)
         ORDER BY g.id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let actor_rows: Vec<PlayActorRow> = sqlx::query_as(
        "SELECT pa.play_id, a.id, a.first_name, a.last_name
         FROM play_actors pa
         JOIN actors a ON a.id = pa.actor_id
         WHERE pa.play_id = ANY($1)
         ORDER BY a.id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut genres: HashMap<i64, Vec<Genre>> = HashMap::new();
    for r in genre_rows {
        genres.entry(r.play_id).or_default().push(Genre { id: r.id, name: r.name });
    }
    let mut actors: HashMap<i64, Vec<Actor>> = HashMap::new();
    for r in actor_rows {
        actors.entry(r.play_id).or_default().push(Actor {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
        });
    }

    Ok(plays
        .into_iter()
        .map(|play| PlayRecord {
            genres: genres.remove(&play.id).unwrap_or_default(),
            actors: actors.remove(&play.id).unwrap_or_default(),
            play,
        })
        .collect())
}

async fn replace_relations(conn: &mut PgConnection, play_id: i64, input: &PlayInput) -> StoreResult<()> {
    let (genres, actors) = input.relation_sets();

    sqlx::query("DELETE FROM play_genres WHERE play_id = $1")
        .bind(play_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM play_actors WHERE play_id = $1")
        .bind(play_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("INSERT INTO play_genres (play_id, genre_id) SELECT $1, UNNEST($2::BIGINT[])")
        .bind(play_id)
        .bind(&genres)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO play_actors (play_id, actor_id) SELECT $1, UNNEST($2::BIGINT[])")
        .bind(play_id)
        .bind(&actors)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn count(&self, sql: &'static str) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.db.pool).await?)
    }

    async fn reservation_records(&self, reservations: Vec<Reservation>) -> StoreResult<Vec<ReservationRecord>> {
        let ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();
        let rows: Vec<TicketSummaryRow> = sqlx::query_as(concat!(
            "SELECT t.id AS ticket_id, t.row, t.seat, t.reservation_id, ",
            summary_columns!(),
            " FROM tickets t JOIN performances p ON p.id = t.performance_id ",
            performance_joins!(),
            " WHERE t.reservation_id = ANY($1) ORDER BY t.id"
        ))
        .bind(&ids)
        .fetch_all(&self.db.pool)
        .await?;

        let mut tickets: HashMap<i64, Vec<TicketRecord>> = HashMap::new();
        for row in rows {
            let ticket = Ticket {
                id: row.ticket_id,
                row: row.row,
                seat: row.seat,
                performance_id: row.performance.performance_id,
                reservation_id: row.reservation_id,
            };
            tickets.entry(row.reservation_id).or_default().push(TicketRecord {
                ticket,
                performance: row.performance.into(),
            });
        }

        Ok(reservations
            .into_iter()
            .map(|reservation| ReservationRecord {
                tickets: tickets.remove(&reservation.id).unwrap_or_default(),
                reservation,
            })
            .collect())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.db.ping().await
    }

    /* ---------- users ---------- */

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, is_staff) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(NewUser::normalized_email(&user.email))
            .bind(&user.password_hash)
            .bind(user.is_staff)
            .fetch_one(&self.db.pool)
            .await?)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(NewUser::normalized_email(email))
            .fetch_optional(&self.db.pool)
            .await?)
    }

    /* ---------- genres ---------- */

    async fn list_genres(&self, page: PageRequest) -> StoreResult<Paged<Genre>> {
        let count = self.count("SELECT COUNT(*) FROM genres").await?;
        let items = sqlx::query_as::<_, Genre>(
            "SELECT id, name FROM genres ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db.pool)
        .await?;
        Ok(Paged { count, items })
    }

    async fn get_genre(&self, id: i64) -> StoreResult<Option<Genre>> {
        Ok(sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?)
    }

    async fn create_genre(&self, input: GenreInput) -> StoreResult<Genre> {
        Ok(sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&input.name)
        .fetch_one(&self.db.pool)
        .await?)
    }

    async fn update_genre(&self, id: i64, input: GenreInput) -> StoreResult<Option<Genre>> {
        Ok(sqlx::query_as::<_, Genre>(
            "UPDATE genres SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(&input.name)
        .fetch_optional(&self.db.pool)
        .await?)
    }

    async fn delete_genre(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /* ---------- actors ---------- */

    async fn list_actors(&self, page: PageRequest) -> StoreResult<Paged<Actor>> {
        let count = self.count("SELECT COUNT(*) FROM actors").await?;
        let items = sqlx::query_as::<_, Actor>(
            "SELECT id, first_name, last_name FROM actors ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db.pool)
        .await?;
        Ok(Paged { count, items })
    }

    async fn get_actor(&self, id: i64) -> StoreResult<Option<Actor>> {
        Ok(sqlx::query_as::<_, Actor>(
            "SELECT id, first_name, last_name FROM actors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?)
    }

    async fn create_actor(&self, input: ActorInput) -> StoreResult<Actor> {
        Ok(sqlx::query_as::<_, Actor>(
            "INSERT INTO actors (first_name, last_name) VALUES ($1, $2)
             RETURNING id, first_name, last_name",
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .fetch_one(&self.db.pool)
        .await?)
    }

    async fn update_actor(&self, id: i64, input: ActorInput) -> StoreResult<Option<Actor>> {
        Ok(sqlx::query_as::<_, Actor>(
            "UPDATE actors SET first_name = $2, last_name = $3 WHERE id = $1
             RETURNING id, first_name, last_name",
        )
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .fetch_optional(&self.db.pool)
        .await?)
    }

    async fn delete_actor(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM actors WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /* ---------- theatre halls ---------- */

    async fn list_halls(&self, page: PageRequest) -> StoreResult<Paged<TheatreHall>> {
        let count = self.count("SELECT COUNT(*) FROM theatre_halls").await?;
        let items = sqlx::query_as::<_, TheatreHall>(
            "SELECT id, name, rows, seats_in_row FROM theatre_halls ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db.pool)
        .await?;
        Ok(Paged { count, items })
    }

    async fn get_hall(&self, id: i64) -> StoreResult<Option<TheatreHall>> {
        Ok(sqlx::query_as::<_, TheatreHall>(
            "SELECT id, name, rows, seats_in_row FROM theatre_halls WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?)
    }

    async fn create_hall(&self, input: TheatreHallInput) -> StoreResult<TheatreHall> {
        Ok(sqlx::query_as::<_, TheatreHall>(
            "INSERT INTO theatre_halls (name, rows, seats_in_row) VALUES ($1, $2, $3)
             RETURNING id, name, rows, seats_in_row",
        )
        .bind(&input.name)
        .bind(input.rows)
        .bind(input.seats_in_row)
        .fetch_one(&self.db.pool)
        .await?)
    }

    async fn update_hall(
        &self,
        id: i64,
        input: TheatreHallInput,
    ) -> StoreResult<Option<TheatreHall>> {
        Ok(sqlx::query_as::<_, TheatreHall>(
            "UPDATE theatre_halls SET name = $2, rows = $3, seats_in_row = $4 WHERE id = $1
             RETURNING id, name, rows, seats_in_row",
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.rows)
        .bind(input.seats_in_row)
        .fetch_optional(&self.db.pool)
        .await?)
    }

    async fn delete_hall(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM theatre_halls WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /* ---------- plays ---------- */

    async fn list_plays(
        &self,
        filter: &PlayFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<PlayRecord>> {
        let count = sqlx::query_scalar::<_, i64>(concat!(
            "SELECT COUNT(*) FROM plays pl ",
            play_filter!()
        ))
        .bind(filter.genres.as_deref())
        .bind(filter.actors.as_deref())
        .fetch_one(&self.db.pool)
        .await?;

        let plays: Vec<Play> = sqlx::query_as(concat!(
            "SELECT pl.id, pl.title, pl.description FROM plays pl ",
            play_filter!(),
            " ORDER BY pl.id LIMIT $3 OFFSET $4"
        ))
        .bind(filter.genres.as_deref())
        .bind(filter.actors.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db.pool)
        .await?;

        let mut conn = self.db.pool.acquire().await?;
        let items = attach_relations(&mut conn, plays).await?;
        Ok(Paged { count, items })
    }

    async fn get_play(&self, id: i64) -> StoreResult<Option<PlayRecord>> {
        let mut conn = self.db.pool.acquire().await?;
        let play: Option<Play> =
            sqlx::query_as("SELECT id, title, description FROM plays WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        match play {
            Some(play) => Ok(attach_relations(&mut conn, vec![play]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create_play(&self, input: PlayInput) -> StoreResult<PlayRecord> {
        let mut tx = self.db.pool.begin().await?;
        let play: Play = sqlx::query_as(
            "INSERT INTO plays (title, description) VALUES ($1, $2)
             RETURNING id, title, description",
        )
        .bind(&input.title)
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;

        replace_relations(&mut tx, play.id, &input).await?;
        let mut records = attach_relations(&mut tx, vec![play]).await?;
        tx.commit().await?;

        records
            .pop()
            .ok_or_else(|| super::StoreError::Unavailable("inserted play vanished".into()))
    }

    async fn update_play(&self, id: i64, input: PlayInput) -> StoreResult<Option<PlayRecord>> {
        let mut tx = self.db.pool.begin().await?;
        let play: Option<Play> = sqlx::query_as(
            "UPDATE plays SET title = $2, description = $3 WHERE id = $1
             RETURNING id, title, description",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(play) = play else {
            return Ok(None);
        };

        replace_relations(&mut tx, id, &input).await?;
        let mut records = attach_relations(&mut tx, vec![play]).await?;
        tx.commit().await?;
        Ok(records.pop())
    }

    async fn delete_play(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM plays WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /* ---------- performances ---------- */

    async fn list_performances(
        &self,
        filter: &PerformanceFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<PerformanceSummary>> {
        let title = filter.play_title.as_deref().map(like_fragment);

        let count = sqlx::query_scalar::<_, i64>(concat!(
            "SELECT COUNT(*) FROM performances p ",
            performance_joins!(),
            performance_filter!()
        ))
        .bind(title.as_deref())
        .bind(filter.date)
        .fetch_one(&self.db.pool)
        .await?;

        let rows: Vec<PerformanceSummaryRow> = sqlx::query_as(concat!(
            "SELECT ",
            summary_columns!(),
            " FROM performances p ",
            performance_joins!(),
            performance_filter!(),
            " ORDER BY p.show_time, p.id LIMIT $3 OFFSET $4"
        ))
        .bind(title.as_deref())
        .bind(filter.date)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db.pool)
        .await?;

        Ok(Paged {
            count,
            items: rows.into_iter().map(Into::into).collect(),
        })
    }

    async fn get_performance(&self, id: i64) -> StoreResult<Option<PerformanceRecord>> {
        let row: Option<PerformanceSummaryRow> = sqlx::query_as(concat!(
            "SELECT ",
            summary_columns!(),
            " FROM performances p ",
            performance_joins!(),
            " WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        let Some(summary) = row.map(PerformanceSummary::from) else {
            return Ok(None);
        };
        let Some(play) = self.get_play(summary.play.id).await? else {
            return Ok(None);
        };

        let taken_places: Vec<SeatPosition> = sqlx::query_as(
            "SELECT row, seat FROM tickets WHERE performance_id = $1 ORDER BY row, seat",
        )
        .bind(id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(Some(PerformanceRecord {
            id: summary.id,
            show_time: summary.show_time,
            play,
            theatre_hall: summary.theatre_hall,
            taken_places,
        }))
    }

    async fn create_performance(&self, input: PerformanceInput) -> StoreResult<Performance> {
        Ok(sqlx::query_as::<_, Performance>(
            "INSERT INTO performances (play_id, theatre_hall_id, show_time) VALUES ($1, $2, $3)
             RETURNING id, play_id, theatre_hall_id, show_time",
        )
        .bind(input.play)
        .bind(input.theatre_hall)
        .bind(input.show_time)
        .fetch_one(&self.db.pool)
        .await?)
    }

    async fn update_performance(
        &self,
        id: i64,
        input: PerformanceInput,
    ) -> StoreResult<Option<Performance>> {
        Ok(sqlx::query_as::<_, Performance>(
            "UPDATE performances SET play_id = $2, theatre_hall_id = $3, show_time = $4
             WHERE id = $1
             RETURNING id, play_id, theatre_hall_id, show_time",
        )
        .bind(id)
        .bind(input.play)
        .bind(input.theatre_hall)
        .bind(input.show_time)
        .fetch_optional(&self.db.pool)
        .await?)
    }

    async fn delete_performance(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM performances WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /* ---------- reservations ---------- */

    async fn list_reservations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> StoreResult<Paged<ReservationRecord>> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.db.pool)
        .await?;

        let reservations: Vec<Reservation> = sqlx::query_as(
            "SELECT id, user_id, created_at FROM reservations
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db.pool)
        .await?;

        let items = self.reservation_records(reservations).await?;
        Ok(Paged { count, items })
    }

    async fn get_reservation(
        &self,
        user_id: i64,
        id: i64,
    ) -> StoreResult<Option<ReservationRecord>> {
        let reservation: Option<Reservation> = sqlx::query_as(
            "SELECT id, user_id, created_at FROM reservations WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db.pool)
        .await?;

        match reservation {
            Some(r) => Ok(self.reservation_records(vec![r]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete_reservation(&self, user_id: i64, id: i64) -> StoreResult<bool> {
        // билеты удалятся через ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM reservations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn begin_booking(&self) -> StoreResult<Box<dyn BookingTx>> {
        let tx = self.db.pool.begin().await?;
        Ok(Box::new(PgBookingTx { tx }))
    }
}

/// Booking inside one postgres transaction. Rolled back by sqlx on drop.
struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn performance_hall(&mut self, performance_id: i64) -> StoreResult<Option<TheatreHall>> {
        Ok(sqlx::query_as::<_, TheatreHall>(
            "SELECT h.id, h.name, h.rows, h.seats_in_row
             FROM performances p
             JOIN theatre_halls h ON h.id = p.theatre_hall_id
             WHERE p.id = $1",
        )
        .bind(performance_id)
        .fetch_optional(&mut *self.tx)
        .await?)
    }

    async fn seat_taken(&mut self, performance_id: i64, row: i32, seat: i32) -> StoreResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM tickets WHERE performance_id = $1 AND row = $2 AND seat = $3
             )",
        )
        .bind(performance_id)
        .bind(row)
        .bind(seat)
        .fetch_one(&mut *self.tx)
        .await?)
    }

    async fn insert_reservation(&mut self, user_id: i64) -> StoreResult<Reservation> {
        Ok(sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (user_id) VALUES ($1) RETURNING id, user_id, created_at",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?)
    }

    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        request: &TicketRequest,
    ) -> StoreResult<Ticket> {
        // при гонке последнее слово за tickets_performance_seat_key
        Ok(sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (row, seat, performance_id, reservation_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id, row, seat, performance_id, reservation_id",
        )
        .bind(request.row)
        .bind(request.seat)
        .bind(request.performance)
        .bind(reservation_id)
        .fetch_one(&mut *self.tx)
        .await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::like_fragment;

    #[test]
    fn like_fragment_escapes_wildcards() {
        assert_eq!(like_fragment("50%_off"), "50\\%\\_off");
        assert_eq!(like_fragment("hamlet"), "hamlet");
    }
}
