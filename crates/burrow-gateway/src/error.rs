use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use burrow_core::ShortenerError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("invalid JSON")]
    InvalidJson(#[from] JsonRejection),
    #[error("not found")]
    NotFound,
    #[error("gone")]
    Gone,
    #[error("unauthorized")]
    Unauthorized,
    #[error("storage unavailable")]
    Unavailable,
    #[error("invalid header value")]
    ResponseHeader(#[from] header::InvalidHeaderValue),
    #[error(transparent)]
    Shortener(ShortenerError),
}

impl From<ShortenerError> for AppError {
    fn from(err: ShortenerError) -> Self {
        match err {
            ShortenerError::EmptyUrl => AppError::BadRequest("original url is empty"),
            ShortenerError::EmptyShortCode => AppError::BadRequest("short code is empty"),
            ShortenerError::EmptyOwner => AppError::Unauthorized,
            ShortenerError::EmptyBatch => AppError::BadRequest("batch is empty"),
            ShortenerError::EmptyCorrelationId => AppError::BadRequest("correlation id is empty"),
            ShortenerError::NotFound(_) => AppError::NotFound,
            ShortenerError::Gone(_) => AppError::Gone,
            other => AppError::Shortener(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Client errors are not logged; internal ones are, without leaking
        // details to the caller.
        let (status, code, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", *msg),
            AppError::InvalidJson(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_json",
                "Invalid JSON in request body",
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "The requested short URL does not exist",
            ),
            AppError::Gone => (
                StatusCode::GONE,
                "gone",
                "The requested short URL has been deleted",
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "No valid user identity",
            ),
            AppError::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_unavailable",
                "Storage is unavailable",
            ),
            AppError::ResponseHeader(e) => {
                error!(error = ?e, "failed to construct response header");
                internal()
            }
            AppError::Shortener(e) => {
                error!(error = %e, "request failed");
                internal()
            }
        };

        (
            status,
            Json(ErrorBody {
                code,
                error: message,
            }),
        )
            .into_response()
    }
}

fn internal() -> (StatusCode, &'static str, &'static str) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Internal server error",
    )
}
