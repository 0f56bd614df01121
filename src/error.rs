//! HTTP-facing error taxonomy.
//!
//! Every handler returns `Result<_, ApiError>`. Seat conflicts and seat
//! bounds violations carry their own codes so clients can tell them apart
//! from malformed input.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication credentials were not provided or are invalid")]
    AuthenticationRequired,

    #[error("you do not have permission to perform this action")]
    PermissionDenied,

    #[error("{0} not found")]
    NotFound(String),

    #[error("seat (row {row}, seat {seat}) is outside the hall: rows 1..={rows}, seats 1..={seats_in_row}")]
    OutOfBounds {
        row: i32,
        seat: i32,
        rows: i32,
        seats_in_row: i32,
    },

    #[error("seat (row {row}, seat {seat}) is already taken for performance {performance}")]
    SeatTaken { performance: i64, row: i32, seat: i32 },

    #[error("{0}")]
    Validation(String),

    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn not_found(resource: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{resource} with id {id}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal(err.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::OutOfBounds { .. } | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::SeatTaken { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            ApiError::PermissionDenied => "PERMISSION_DENIED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::OutOfBounds { .. } => "OUT_OF_BOUNDS",
            ApiError::SeatTaken { .. } => "SEAT_TAKEN",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(source) = &self {
            tracing::error!(status = %status, error = ?source, "request failed");
        }

        let mut response = (
            status,
            Json(ErrorBody {
                code: self.code(),
                message: self.to_string(),
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer, Basic realm=\"theatre\""),
            );
        }
        response
    }
}

/// Constraint failures on catalog writes are client mistakes; everything
/// else from the store is a server fault.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) => match constraint.as_str() {
                "genres_name_key" => ApiError::validation("genre with this name already exists"),
                "users_email_key" => ApiError::validation("user with this email already exists"),
                other => ApiError::validation(format!("duplicate value violates {other}")),
            },
            StoreError::ForeignKeyViolation(what) => {
                ApiError::validation(format!("invalid reference: {what}"))
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{field}: {}", reasons.join(", "))
            })
            .collect();
        fields.sort();
        ApiError::Validation(fields.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_errors_are_distinguishable_from_validation() {
        let taken = ApiError::SeatTaken { performance: 1, row: 1, seat: 1 };
        let bounds = ApiError::OutOfBounds { row: 21, seat: 1, rows: 20, seats_in_row: 20 };
        let invalid = ApiError::validation("tickets: must not be empty");

        assert_eq!(taken.status(), StatusCode::CONFLICT);
        assert_eq!(bounds.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_ne!(bounds.code(), invalid.code());
        assert_eq!(taken.code(), "SEAT_TAKEN");
    }

    #[test]
    fn duplicate_genre_maps_to_validation() {
        let err: ApiError = StoreError::UniqueViolation("genres_name_key".into()).into();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "genre with this name already exists");
    }

    #[test]
    fn store_outage_is_internal() {
        let err: ApiError = StoreError::Unavailable("pool closed".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "internal server error");
    }
}
