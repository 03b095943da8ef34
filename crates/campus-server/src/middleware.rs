use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use campus_session::Session;
use campus_types::ActionError;
use std::sync::Arc;

use crate::api::ApiError;
use crate::AppState;

/// The authenticated session of a request, stored in request extensions.
#[derive(Clone)]
pub struct SessionContext {
    pub token: String,
    pub session: Arc<Session>,
}

/// Middleware to authenticate requests via `Authorization: Bearer <token>`.
///
/// The token is the one issued at login or registration. Unknown tokens and
/// sessions that have since logged out are rejected with `not_authenticated`.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Response {
    let token = match req
        .headers()
        .get("Authorization")
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "))
    {
        Some(token) => token.trim().to_string(),
        None => return ApiError::from(ActionError::NotAuthenticated).into_response(),
    };

    let state = match req.extensions().get::<Arc<AppState>>() {
        Some(state) => state.clone(),
        None => {
            return ApiError::Internal("application state missing".to_string()).into_response()
        }
    };

    let session = match state.sessions.get(&token) {
        Some(session) if session.actor().is_some() => session,
        _ => return ApiError::from(ActionError::NotAuthenticated).into_response(),
    };

    req.extensions_mut().insert(SessionContext { token, session });
    next.run(req).await
}
