pub mod user;
pub mod genre;
pub mod actor;
pub mod play;
pub mod theatre_hall;
pub mod performance;
pub mod reservation;

pub use user::{NewUser, User};
pub use genre::{Genre, GenreInput};
pub use actor::{Actor, ActorInput};
pub use play::{Play, PlayInput, PlayRecord};
pub use theatre_hall::{TheatreHall, TheatreHallInput};
pub use performance::{Performance, PerformanceInput, PerformanceRecord, PerformanceSummary};
pub use reservation::{Reservation, ReservationRecord, SeatPosition, Ticket, TicketRecord, TicketRequest};

/// Lenient parsing for naive timestamps such as `2024-10-15 18:00`.
pub mod show_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer};

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid show_time {raw:?}, expected YYYY-MM-DD HH:MM[:SS]"
            ))
        })
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "invalid show_time {raw:?}, expected YYYY-MM-DD HH:MM[:SS]"
                ))
            }),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::parse;

        #[test]
        fn accepts_space_and_iso_separators() {
            let a = parse("2024-10-15 18:00").unwrap();
            let b = parse("2024-10-15T18:00:00").unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn rejects_date_without_time() {
            assert!(parse("2024-10-15").is_none());
        }
    }
}
