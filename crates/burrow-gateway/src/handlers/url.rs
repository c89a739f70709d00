use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use burrow_core::{ShortenParams, Shortened};

use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::model::{ShortenRequest, ShortenResponse};
use crate::state::AppState;

/// Checks that `raw` is an absolute http(s) URL with a host and returns it
/// trimmed. The URL is stored as given, not normalized.
pub(crate) fn validate_url(raw: &str) -> Result<&str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("original url is empty"));
    }

    let url = url::Url::parse(raw).map_err(|_| AppError::BadRequest("invalid url"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::BadRequest("only http and https urls are allowed"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(AppError::BadRequest("url has no host"));
    }

    Ok(raw)
}

fn status_of(shortened: &Shortened) -> StatusCode {
    if shortened.is_existing() {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

async fn shorten(state: &AppState, original_url: &str, identity: Identity) -> Result<Shortened> {
    let original_url = validate_url(original_url)?;
    let shortened = state
        .shortener()
        .shorten(ShortenParams {
            original_url: original_url.to_string(),
            owner_id: identity.owner_id,
        })
        .await?;
    Ok(shortened)
}

/// `POST /` with the URL as plain text.
pub async fn create_url_text(
    State(state): State<AppState>,
    identity: Identity,
    body: String,
) -> Result<Response> {
    let shortened = shorten(&state, &body, identity).await?;
    let short_url = state.short_url(shortened.code());

    Ok((
        status_of(&shortened),
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        short_url,
    )
        .into_response())
}

/// `POST /api/shorten` with `{"url": "..."}`.
pub async fn create_url_json(
    State(state): State<AppState>,
    identity: Identity,
    payload: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let shortened = shorten(&state, &request.url, identity).await?;
    let body = ShortenResponse {
        result: state.short_url(shortened.code()),
    };

    Ok((status_of(&shortened), Json(body)).into_response())
}

/// `GET /{code}`; also mounted on `/` so an empty code is a bad request.
pub async fn redirect(
    State(state): State<AppState>,
    code: Option<Path<String>>,
) -> Result<Response> {
    let code = code.map(|Path(code)| code).unwrap_or_default();
    let original_url = state.shortener().resolve(&code).await?;

    Ok((
        StatusCode::TEMPORARY_REDIRECT,
        [(header::LOCATION, HeaderValue::from_str(&original_url)?)],
    )
        .into_response())
}
