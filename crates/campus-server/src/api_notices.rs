//! Notice board handlers.

use crate::api::ApiError;
use crate::middleware::SessionContext;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use campus_store::{CreateNoticeParams, Notice, UpdateNoticeParams};

/// Handler for `GET /api/notices`.
pub async fn list_notices_handler(
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<Notice>>, ApiError> {
    Ok(Json(ctx.session.list_notices().await?))
}

/// Handler for `POST /api/notices`.
pub async fn create_notice_handler(
    Extension(ctx): Extension<SessionContext>,
    Json(payload): Json<CreateNoticeParams>,
) -> Result<(StatusCode, Json<Notice>), ApiError> {
    let notice = ctx.session.create_notice(payload).await?;
    Ok((StatusCode::CREATED, Json(notice)))
}

/// Handler for `PATCH /api/notices/{noticeId}`.
pub async fn update_notice_handler(
    Extension(ctx): Extension<SessionContext>,
    Path(notice_id): Path<String>,
    Json(payload): Json<UpdateNoticeParams>,
) -> Result<Json<Notice>, ApiError> {
    Ok(Json(ctx.session.update_notice(&notice_id, payload).await?))
}

/// Handler for `DELETE /api/notices/{noticeId}`.
pub async fn delete_notice_handler(
    Extension(ctx): Extension<SessionContext>,
    Path(notice_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.session.delete_notice(&notice_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
