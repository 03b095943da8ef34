//! Job board handlers.

use crate::api::ApiError;
use crate::middleware::SessionContext;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use campus_store::{CreateJobParams, Job, UpdateJobParams};

/// Handler for `GET /api/jobs`.
pub async fn list_jobs_handler(
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(ctx.session.list_jobs().await?))
}

/// Handler for `POST /api/jobs`.
pub async fn create_job_handler(
    Extension(ctx): Extension<SessionContext>,
    Json(payload): Json<CreateJobParams>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let job = ctx.session.create_job(payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// Handler for `PATCH /api/jobs/{jobId}`.
pub async fn update_job_handler(
    Extension(ctx): Extension<SessionContext>,
    Path(job_id): Path<String>,
    Json(payload): Json<UpdateJobParams>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(ctx.session.update_job(&job_id, payload).await?))
}

/// Handler for `DELETE /api/jobs/{jobId}`.
pub async fn delete_job_handler(
    Extension(ctx): Extension<SessionContext>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.session.delete_job(&job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
