use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::Result;
use crate::identity::Identity;
use crate::model::{DeleteRequest, UserUrl};
use crate::state::AppState;

/// `GET /api/user/urls`.
pub async fn list_user_urls(State(state): State<AppState>, identity: Identity) -> Result<Response> {
    let owner_id = identity.known_owner()?;
    let records = state.shortener().list_by_owner(owner_id).await?;

    if records.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<UserUrl> = records
        .into_iter()
        .map(|record| UserUrl {
            short_url: state.short_url(&record.short_code),
            original_url: record.original_url,
        })
        .collect();

    Ok(Json(body).into_response())
}

/// `DELETE /api/user/urls`. Deletion is accepted, not confirmed: codes that
/// do not belong to the caller are ignored.
pub async fn delete_user_urls(
    State(state): State<AppState>,
    identity: Identity,
    payload: std::result::Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let owner_id = identity.known_owner()?;
    let Json(request) = payload?;
    let codes = request.into_codes();

    state.shortener().delete_batch(&codes, owner_id).await?;
    tracing::info!(owner_id, requested = codes.len(), "url deletion accepted");

    Ok(StatusCode::ACCEPTED)
}
