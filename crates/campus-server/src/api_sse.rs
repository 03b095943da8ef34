//! SSE inbox stream handler.

use crate::api::ApiError;
use crate::middleware::SessionContext;
use axum::{
    extract::Extension,
    response::{sse::Event, Sse},
};
use campus_types::ActionError;
use futures_util::Stream;
use std::convert::Infallible;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

/// Handler for `GET /events/messages`.
///
/// Streams the full ordered inbox on connect and again after every change.
/// The stream ends when the session logs out.
pub async fn inbox_stream_handler(
    Extension(ctx): Extension<SessionContext>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let rx = ctx
        .session
        .watch_inbox()
        .ok_or(ActionError::NotAuthenticated)?;
    let stream = WatchStream::new(rx);

    let mapped_stream = stream.filter_map(|snapshot| {
        match serde_json::to_string(snapshot.as_slice()) {
            Ok(data) => Some(Ok(Event::default().event("inbox").data(data))),
            Err(e) => {
                tracing::error!("failed to serialize inbox snapshot: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(mapped_stream).keep_alive(axum::response::sse::KeepAlive::default()))
}
