use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;

use crate::error::{AppError, Result};
use crate::state::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// `GET /ping`: `200 OK` when storage answers within two seconds.
pub async fn ping(State(state): State<AppState>) -> Result<(StatusCode, &'static str)> {
    match tokio::time::timeout(PING_TIMEOUT, state.shortener().ping()).await {
        Ok(Ok(())) => Ok((StatusCode::OK, "OK")),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "storage ping failed");
            Err(AppError::Unavailable)
        }
        Err(_) => {
            tracing::error!(timeout = ?PING_TIMEOUT, "storage ping timed out");
            Err(AppError::Unavailable)
        }
    }
}
