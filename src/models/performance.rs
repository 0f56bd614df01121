use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{Play, PlayRecord, SeatPosition, TheatreHall};

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Performance {
    pub id: i64,
    pub play_id: i64,
    pub theatre_hall_id: i64,
    pub show_time: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PerformanceInput {
    pub play: i64,
    pub theatre_hall: i64,
    #[serde(deserialize_with = "super::show_time::deserialize")]
    pub show_time: NaiveDateTime,
}

/// Row shape used by listings: plain play, hall and sold ticket count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceSummary {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub play: Play,
    pub theatre_hall: TheatreHall,
    pub tickets_taken: i64,
}

impl PerformanceSummary {
    pub fn tickets_available(&self) -> i64 {
        (self.theatre_hall.capacity() - self.tickets_taken).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceRecord {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub play: PlayRecord,
    pub theatre_hall: TheatreHall,
    pub taken_places: Vec<SeatPosition>,
}
