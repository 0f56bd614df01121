use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{Actor, Genre};

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Play {
    pub id: i64,
    pub title: String,
    pub description: String,
}

/// A play with its genre and actor sets resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRecord {
    pub play: Play,
    pub genres: Vec<Genre>,
    pub actors: Vec<Actor>,
}

impl PlayRecord {
    pub fn genre_ids(&self) -> Vec<i64> {
        self.genres.iter().map(|g| g.id).collect()
    }

    pub fn actor_ids(&self) -> Vec<i64> {
        self.actors.iter().map(|a| a.id).collect()
    }
}

/// Genre and actor ids replace the play's junction sets wholesale.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlayInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub actors: Vec<i64>,
}

impl PlayInput {
    /// Sorted, duplicate-free copies of the requested relation ids.
    pub fn relation_sets(&self) -> (Vec<i64>, Vec<i64>) {
        let mut genres = self.genres.clone();
        genres.sort_unstable();
        genres.dedup();
        let mut actors = self.actors.clone();
        actors.sort_unstable();
        actors.dedup();
        (genres, actors)
    }
}
