use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TheatreHall {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

impl TheatreHall {
    pub fn capacity(&self) -> i64 {
        i64::from(self.rows) * i64::from(self.seats_in_row)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TheatreHallInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 1, message = "rows must be positive"))]
    pub rows: i32,
    #[validate(range(min = 1, message = "seats_in_row must be positive"))]
    pub seats_in_row: i32,
}
