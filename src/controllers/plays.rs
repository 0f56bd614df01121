use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::actors::ActorResponse;
use super::{Page, PageParams, Representation};
use crate::error::ApiError;
use crate::extract::{parse_id_list, ApiQuery, ValidJson};
use crate::middleware::{AuthUser, StaffUser};
use crate::models::{Genre, PlayInput, PlayRecord};
use crate::store::PlayFilter;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plays", get(list_plays).post(create_play))
        .route(
            "/plays/{id}",
            get(get_play)
                .put(update_play)
                .patch(patch_play)
                .delete(delete_play),
        )
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PlayResponse {
    List {
        id: i64,
        title: String,
        description: String,
        genres: Vec<String>,
        actors: Vec<String>,
    },
    Detail {
        id: i64,
        title: String,
        description: String,
        genres: Vec<Genre>,
        actors: Vec<ActorResponse>,
    },
    Write {
        id: i64,
        title: String,
        description: String,
        genres: Vec<i64>,
        actors: Vec<i64>,
    },
}

impl PlayResponse {
    pub fn build(record: &PlayRecord, representation: Representation) -> Self {
        let play = &record.play;
        match representation {
            Representation::List => PlayResponse::List {
                id: play.id,
                title: play.title.clone(),
                description: play.description.clone(),
                genres: record.genres.iter().map(|g| g.name.clone()).collect(),
                actors: record.actors.iter().map(|a| a.full_name()).collect(),
            },
            Representation::Detail => PlayResponse::Detail {
                id: play.id,
                title: play.title.clone(),
                description: play.description.clone(),
                genres: record.genres.clone(),
                actors: record.actors.iter().map(ActorResponse::from).collect(),
            },
            Representation::Write => PlayResponse::Write {
                id: play.id,
                title: play.title.clone(),
                description: play.description.clone(),
                genres: record.genre_ids(),
                actors: record.actor_ids(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PlayQuery {
    genres: Option<String>,
    actors: Option<String>,
    page: Option<u32>,
    #[serde(alias = "pageSize")]
    page_size: Option<u32>,
}

impl PlayQuery {
    fn page(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }

    fn filter(&self) -> Result<PlayFilter, ApiError> {
        Ok(PlayFilter {
            genres: self
                .genres
                .as_deref()
                .map(|raw| parse_id_list("genres", raw))
                .transpose()?
                .filter(|ids| !ids.is_empty()),
            actors: self
                .actors
                .as_deref()
                .map(|raw| parse_id_list("actors", raw))
                .transpose()?
                .filter(|ids| !ids.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
struct PlayPatch {
    #[validate(length(min = 1, max = 255))]
    title: Option<String>,
    description: Option<String>,
    genres: Option<Vec<i64>>,
    actors: Option<Vec<i64>>,
}

async fn list_plays(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<PlayQuery>,
) -> Result<Json<Page<PlayResponse>>, ApiError> {
    let filter = query.filter()?;
    let page = query.page().resolve(&state.config.pagination);
    let plays = state.store.list_plays(&filter, page).await?;
    Ok(Json(Page::new(plays, page, |p| {
        PlayResponse::build(&p, Representation::List)
    })))
}

async fn get_play(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PlayResponse>, ApiError> {
    let play = state
        .store
        .get_play(id)
        .await?
        .ok_or_else(|| ApiError::not_found("play", id))?;
    Ok(Json(PlayResponse::build(&play, Representation::Detail)))
}

async fn create_play(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    ValidJson(input): ValidJson<PlayInput>,
) -> Result<impl IntoResponse, ApiError> {
    let play = state.store.create_play(input).await?;
    tracing::info!(play_id = play.play.id, "play created");
    Ok((
        StatusCode::CREATED,
        Json(PlayResponse::build(&play, Representation::Write)),
    ))
}

async fn update_play(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<PlayInput>,
) -> Result<Json<PlayResponse>, ApiError> {
    let play = state
        .store
        .update_play(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("play", id))?;
    Ok(Json(PlayResponse::build(&play, Representation::Write)))
}

async fn patch_play(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    ValidJson(patch): ValidJson<PlayPatch>,
) -> Result<Json<PlayResponse>, ApiError> {
    let current = state
        .store
        .get_play(id)
        .await?
        .ok_or_else(|| ApiError::not_found("play", id))?;
    let input = PlayInput {
        genres: patch.genres.unwrap_or_else(|| current.genre_ids()),
        actors: patch.actors.unwrap_or_else(|| current.actor_ids()),
        title: patch.title.unwrap_or(current.play.title),
        description: patch.description.unwrap_or(current.play.description),
    };
    let play = state
        .store
        .update_play(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("play", id))?;
    Ok(Json(PlayResponse::build(&play, Representation::Write)))
}

async fn delete_play(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_play(id).await? {
        return Err(ApiError::not_found("play", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Actor, Play};
    use serde_json::json;

    fn record() -> PlayRecord {
        PlayRecord {
            play: Play {
                id: 7,
                title: "Hamlet".into(),
                description: "".into(),
            },
            genres: vec![Genre {
                id: 2,
                name: "Tragedy".into(),
            }],
            actors: vec![Actor {
                id: 5,
                first_name: "Ian".into(),
                last_name: "Holm".into(),
            }],
        }
    }

    #[test]
    fn list_view_flattens_relations() {
        let value = serde_json::to_value(PlayResponse::build(&record(), Representation::List)).unwrap();
        assert_eq!(value["genres"], json!(["Tragedy"]));
        assert_eq!(value["actors"], json!(["Ian Holm"]));
    }

    #[test]
    fn detail_view_nests_and_write_view_echoes_ids() {
        let detail = serde_json::to_value(PlayResponse::build(&record(), Representation::Detail)).unwrap();
        assert_eq!(detail["actors"][0]["full_name"], "Ian Holm");
        assert_eq!(detail["genres"][0]["name"], "Tragedy");

        let write = serde_json::to_value(PlayResponse::build(&record(), Representation::Write)).unwrap();
        assert_eq!(write["genres"], json!([2]));
        assert_eq!(write["actors"], json!([5]));
    }

    #[test]
    fn malformed_filter_ids_are_rejected() {
        let query = PlayQuery {
            genres: Some("1,two".into()),
            ..Default::default()
        };
        assert_eq!(query.filter().unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn empty_id_list_means_no_filter() {
        let query = PlayQuery {
            genres: Some("".into()),
            actors: Some(" , ".into()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.genres, None);
        assert_eq!(filter.actors, None);
    }
}
