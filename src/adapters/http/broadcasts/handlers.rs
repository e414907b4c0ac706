//! Broadcast trigger endpoint.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::handlers::StartBroadcast;
use crate::domain::foundation::{BroadcastId, DomainError};

use super::super::state::AppState;
use super::super::webhooks::dto::{BroadcastStartResponse, ErrorResponse};

/// POST /broadcasts/:id/start
///
/// Answers as soon as the task is spawned; the run's outcome is only
/// visible in the broadcast's stored status.
pub async fn start_broadcast(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, BroadcastApiError> {
    let id = BroadcastId::new(id);
    let started = state.broadcasts.start(id).await?;

    let (status, label) = match started {
        StartBroadcast::Started(_) => (StatusCode::ACCEPTED, "running".to_string()),
        StartBroadcast::AlreadyRunning => (StatusCode::CONFLICT, "already_running".to_string()),
        StartBroadcast::Finished(status) => (StatusCode::CONFLICT, status.to_string()),
        StartBroadcast::NotFound => {
            let error = ErrorResponse::new("BROADCAST_NOT_FOUND", format!("broadcast {} not found", id));
            return Ok((StatusCode::NOT_FOUND, Json(error)).into_response());
        }
    };

    let body = BroadcastStartResponse {
        broadcast_id: id.as_i64(),
        status: label,
    };
    Ok((status, Json(body)).into_response())
}

pub struct BroadcastApiError(DomainError);

impl From<DomainError> for BroadcastApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BroadcastApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Broadcast start failed");
        let error = ErrorResponse::new("INTERNAL_ERROR", "Failed to start broadcast");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
    }
}
