//! Campus server library logic.

pub mod api;
pub mod api_events;
pub mod api_jobs;
pub mod api_messages;
pub mod api_notices;
pub mod api_sse;
pub mod config;
pub mod middleware;
pub mod retention;
pub mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use campus_db::DbPool;
use campus_realtime::{
    Distributor, DistributorConfig, Fanout, FanoutError, LocalFanout, SharedLogFanout,
    SharedLogSettings,
};
use campus_store::RecordStore;
use config::{FanoutKind, RealtimeConfig};
use serde_json::{json, Value};
use sessions::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Publish/subscribe entry point; also owns the record store handle.
    pub distributor: Distributor,
    /// Logged-in sessions by bearer token.
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Wires the store, the configured fan-out and the distributor.
    ///
    /// Must be called from within a Tokio runtime when the shared-log fan-out
    /// is selected, since it starts a relay task.
    ///
    /// # Errors
    ///
    /// Returns `FanoutError` if the shared-log fan-out cannot be started.
    pub fn new(pool: DbPool, realtime: &RealtimeConfig) -> Result<Self, FanoutError> {
        let fanout: Arc<dyn Fanout> = match realtime.fanout {
            FanoutKind::Local => Arc::new(LocalFanout::new(realtime.channel_capacity)),
            FanoutKind::SharedLog => Arc::new(SharedLogFanout::spawn(
                pool.clone(),
                SharedLogSettings {
                    channel_capacity: realtime.channel_capacity,
                    tail_interval: Duration::from_millis(realtime.tail_interval_ms.max(1)),
                },
            )?),
        };

        let poll_interval =
            (realtime.poll_interval_ms > 0).then(|| Duration::from_millis(realtime.poll_interval_ms));
        let distributor = Distributor::new(
            RecordStore::new(pool.clone()),
            fanout,
            DistributorConfig {
                seen_capacity: realtime.seen_capacity,
                poll_interval,
            },
        );

        tracing::info!(
            fanout = ?realtime.fanout,
            seen_capacity = realtime.seen_capacity,
            poll_interval_ms = realtime.poll_interval_ms,
            "real-time distribution configured"
        );

        Ok(Self {
            pool,
            distributor,
            sessions: SessionRegistry::new(),
        })
    }
}

/// Maximum request body size (1 MiB). Attachments are URLs, not uploads.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/auth/logout", post(api::logout_handler))
        .route("/api/auth/me", get(api::me_handler))
        .route("/api/members", get(api::list_members_handler))
        .route("/api/profile", patch(api::update_profile_handler))
        .route(
            "/api/notices",
            get(api_notices::list_notices_handler).post(api_notices::create_notice_handler),
        )
        .route(
            "/api/notices/{noticeId}",
            patch(api_notices::update_notice_handler).delete(api_notices::delete_notice_handler),
        )
        .route(
            "/api/events",
            get(api_events::list_events_handler).post(api_events::create_event_handler),
        )
        .route("/api/events/{eventId}", delete(api_events::delete_event_handler))
        .route(
            "/api/events/{eventId}/participate",
            post(api_events::participate_handler),
        )
        .route(
            "/api/jobs",
            get(api_jobs::list_jobs_handler).post(api_jobs::create_job_handler),
        )
        .route(
            "/api/jobs/{jobId}",
            patch(api_jobs::update_job_handler).delete(api_jobs::delete_job_handler),
        )
        .route(
            "/api/messages",
            get(api_messages::inbox_handler).post(api_messages::publish_handler),
        )
        .route(
            "/api/messages/conversation/{userId}",
            get(api_messages::conversation_handler),
        )
        .route("/events/messages", get(api_sse::inbox_stream_handler))
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(api::register_handler))
        .route("/api/auth/login", post(api::login_handler))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
