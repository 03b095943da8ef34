//! Campus event handlers.

use crate::api::ApiError;
use crate::middleware::SessionContext;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use campus_store::{CampusEvent, CreateCampusEventParams};

/// Handler for `GET /api/events`.
pub async fn list_events_handler(
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<CampusEvent>>, ApiError> {
    Ok(Json(ctx.session.list_events().await?))
}

/// Handler for `POST /api/events`.
pub async fn create_event_handler(
    Extension(ctx): Extension<SessionContext>,
    Json(payload): Json<CreateCampusEventParams>,
) -> Result<(StatusCode, Json<CampusEvent>), ApiError> {
    let event = ctx.session.create_event(payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Handler for `DELETE /api/events/{eventId}`.
pub async fn delete_event_handler(
    Extension(ctx): Extension<SessionContext>,
    Path(event_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.session.delete_event(&event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `POST /api/events/{eventId}/participate`.
///
/// Idempotent: returns the event with the caller in its participant list.
pub async fn participate_handler(
    Extension(ctx): Extension<SessionContext>,
    Path(event_id): Path<String>,
) -> Result<Json<CampusEvent>, ApiError> {
    Ok(Json(ctx.session.participate(&event_id).await?))
}
