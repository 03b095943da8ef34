//! Account and member handlers, and the API error type.

use crate::middleware::SessionContext;
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use campus_session::{register, Registration, Session};
use campus_store::User;
use campus_types::ActionError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
///
/// The body always carries the stable reason string under `error`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Action(ActionError::NotAuthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Action(ActionError::PermissionDenied { .. }) => StatusCode::FORBIDDEN,
            ApiError::Action(ActionError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Action(ActionError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Action(ActionError::PersistenceFailure(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Action(e) => e.reason(),
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(serde_json::json!({
            "error": self.reason(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Request body for `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response body for successful registration or login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    pub user: User,
}

/// Request body for `PATCH /api/profile`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// Handler for `POST /api/auth/register`.
///
/// Creates the account and logs it in.
pub async fn register_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<Registration>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let user = register(state.distributor.store(), payload).await?;

    let session = Session::new(state.distributor.clone());
    session.attach(user.actor()).await?;
    let token = state.sessions.issue(Arc::new(session));

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// Handler for `POST /api/auth/login`.
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = Session::new(state.distributor.clone());
    let user = session.login(&payload.email, &payload.password).await?;
    let token = state.sessions.issue(Arc::new(session));
    Ok(Json(AuthResponse { token, user }))
}

/// Handler for `POST /api/auth/logout`.
pub async fn logout_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> StatusCode {
    if let Some(session) = state.sessions.revoke(&ctx.token) {
        session.logout();
    }
    StatusCode::NO_CONTENT
}

/// Handler for `GET /api/auth/me`.
pub async fn me_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<User>, ApiError> {
    let actor = ctx.session.identity().require()?;
    let store = state.distributor.store().clone();
    let user = tokio::task::spawn_blocking(move || store.get_user(&actor.id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ActionError::from)?;
    Ok(Json(user))
}

/// Handler for `GET /api/members`.
pub async fn list_members_handler(
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(ctx.session.list_members().await?))
}

/// Handler for `PATCH /api/profile`.
pub async fn update_profile_handler(
    Extension(ctx): Extension<SessionContext>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let user = ctx
        .session
        .update_own_profile(payload.name, payload.avatar)
        .await?;
    Ok(Json(user))
}
