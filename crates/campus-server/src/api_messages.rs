//! Messaging handlers.

use crate::api::ApiError;
use crate::middleware::SessionContext;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use campus_types::{ActionError, ChatEvent, MessageDraft};

/// Handler for `POST /api/messages`.
///
/// Returns the stamped event. The sender's own inbox receives it through the
/// normal delivery path, not from this response.
pub async fn publish_handler(
    Extension(ctx): Extension<SessionContext>,
    Json(payload): Json<MessageDraft>,
) -> Result<(StatusCode, Json<ChatEvent>), ApiError> {
    let event = ctx.session.publish(payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Handler for `GET /api/messages`.
///
/// The session's current inbox: every relevant message, oldest first.
pub async fn inbox_handler(
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<ChatEvent>>, ApiError> {
    let snapshot = ctx.session.inbox().ok_or(ActionError::NotAuthenticated)?;
    Ok(Json(snapshot.to_vec()))
}

/// Handler for `GET /api/messages/conversation/{userId}`.
pub async fn conversation_handler(
    Extension(ctx): Extension<SessionContext>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ChatEvent>>, ApiError> {
    Ok(Json(ctx.session.conversation(&user_id).await?))
}
