use crate::api::AppState;
use crate::api::schemas::triggers::DatabaseWriteEvent;
use crate::domain::notification::MulticastResponse;
use crate::error::{AppError, Result};
use axum::{Json, extract::State, extract::rejection::JsonRejection};

/// Receives a write to a user's availability flag and runs the fan-out.
///
/// Answers 200 with the push response, or `null` when nothing was sent. Fan-out failures
/// are absorbed by the handler and also answer `null`.
///
/// # Errors
/// Returns `AppError::InvalidBody` for undecodable payloads and `AppError::BadRequest`
/// if the written ref does not match the trigger template.
pub async fn availability_written(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DatabaseWriteEvent>, JsonRejection>,
) -> Result<Json<Option<MulticastResponse>>> {
    let Json(event) = payload?;
    let change = event.into_change(&state.trigger_ref).map_err(AppError::BadRequest)?;

    tracing::Span::current().record("uid", change.uid.as_str());
    Ok(Json(state.availability_service.handle(&change).await))
}
