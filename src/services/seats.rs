//! Seat map of a theatre hall.
//!
//! A hall with `rows` x `seats_in_row` defines the coordinate space
//! `{1..=rows} x {1..=seats_in_row}`; every ticket must land inside it.

use crate::models::TheatreHall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("seat (row {row}, seat {seat}) is outside a {rows}x{seats_in_row} hall")]
pub struct OutOfBounds {
    pub row: i32,
    pub seat: i32,
    pub rows: i32,
    pub seats_in_row: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatMap {
    rows: i32,
    seats_in_row: i32,
}

impl SeatMap {
    pub fn new(rows: i32, seats_in_row: i32) -> Self {
        Self { rows, seats_in_row }
    }

    pub fn contains(&self, row: i32, seat: i32) -> bool {
        (1..=self.rows).contains(&row) && (1..=self.seats_in_row).contains(&seat)
    }

    pub fn check(&self, row: i32, seat: i32) -> Result<(), OutOfBounds> {
        if self.contains(row, seat) {
            Ok(())
        } else {
            Err(OutOfBounds {
                row,
                seat,
                rows: self.rows,
                seats_in_row: self.seats_in_row,
            })
        }
    }
}

impl From<&TheatreHall> for SeatMap {
    fn from(hall: &TheatreHall) -> Self {
        SeatMap::new(hall.rows, hall.seats_in_row)
    }
}
