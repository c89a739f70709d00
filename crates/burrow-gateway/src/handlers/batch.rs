use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use burrow_core::BatchItem;

use crate::error::Result;
use crate::handlers::url::validate_url;
use crate::identity::Identity;
use crate::model::{BatchRequestItem, BatchResponseItem};
use crate::state::AppState;

/// `POST /api/shorten/batch`.
///
/// Answers `201` when at least one item was newly created and `409` when
/// every url had already been shortened by the caller.
pub async fn create_batch(
    State(state): State<AppState>,
    identity: Identity,
    payload: std::result::Result<Json<Vec<BatchRequestItem>>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;

    let items = request
        .into_iter()
        .map(|item| -> Result<BatchItem> {
            Ok(BatchItem {
                original_url: validate_url(&item.original_url)?.to_string(),
                correlation_id: item.correlation_id,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let entries = state
        .shortener()
        .shorten_batch(items, &identity.owner_id)
        .await?;

    let status = if entries.iter().all(|entry| entry.existing) {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    };
    tracing::debug!(count = entries.len(), %status, "shortened batch");

    let body: Vec<BatchResponseItem> = entries
        .into_iter()
        .map(|entry| BatchResponseItem {
            short_url: state.short_url(&entry.short_code),
            correlation_id: entry.correlation_id,
        })
        .collect();

    Ok((status, Json(body)).into_response())
}
