//! Job log handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderName,
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    Json,
};
use futures::StreamExt;
use shipyard_api::{TailEvent, TailQuery, HEARTBEAT_COMMENT};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};

use crate::errors::ShipyardError;
use crate::server::state::ServerState;
use crate::streams::{TailFrame, TailStart};

/// Bounded history of a job's log
pub async fn history_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ShipyardError> {
    let history = state.streams.history(&id).await?;
    Ok(Json(history))
}

/// Live tail of a job's log as server-sent events
///
/// `from` is `$` for new entries only, or the last cursor already seen.
pub async fn tail_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Query(query): Query<TailQuery>,
) -> Result<impl IntoResponse, ShipyardError> {
    let start = TailStart::parse(query.from.as_deref())?;
    debug!("Opening tail of job {} from {:?}", id, start);

    let frames = state.streams.tail(&id, start).await?;
    let events = ReceiverStream::new(frames).map(|frame| Ok::<_, Infallible>(to_event(frame)));

    // Reverse proxies must not buffer the stream
    let headers = [(HeaderName::from_static("x-accel-buffering"), "no")];
    Ok((headers, Sse::new(events)))
}

fn to_event(frame: TailFrame) -> Event {
    match frame {
        TailFrame::Connected => data_event(&TailEvent::connected()),
        TailFrame::Entry(record) => data_event(&TailEvent::entry(record.to_entry())),
        TailFrame::Error(message) => data_event(&TailEvent::error(message)),
        TailFrame::Heartbeat => Event::default().comment(HEARTBEAT_COMMENT),
    }
}

fn data_event(event: &TailEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            error!("Failed to encode tail frame: {}", e);
            Event::default().comment("encoding error")
        }
    }
}
