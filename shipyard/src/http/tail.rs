//! Reconnecting follower for the log tail endpoint
//!
//! Delivery from the server is at-least-once across reconnects. The follower
//! resumes from the last cursor it delivered and drops anything at or before
//! it, so each entry reaches the consumer once.

use std::time::Duration;

use futures::StreamExt;
use shipyard_api::{LogEntry, TailEvent, TailEventKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::ShipyardError;
use crate::http::client::HttpClient;
use crate::http::sse::{SseFrame, SseParser};
use crate::streams::cursor::Cursor;

/// Fixed pause before reopening a dropped tail
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Tracks the newest delivered cursor
#[derive(Debug, Clone, Default)]
pub struct CursorDedupe {
    last: Option<Cursor>,
}

impl CursorDedupe {
    pub fn new(last: Option<Cursor>) -> Self {
        Self { last }
    }

    pub fn last(&self) -> Option<Cursor> {
        self.last
    }

    /// Whether an entry with this id is new; records it if so
    pub fn accept(&mut self, id: &str) -> bool {
        let cursor = match id.parse::<Cursor>() {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!("Ignoring tail entry with bad id: {}", e);
                return false;
            }
        };
        if self.last.is_some_and(|last| cursor <= last) {
            debug!("Dropping duplicate tail entry {}", cursor);
            return false;
        }
        self.last = Some(cursor);
        true
    }
}

enum Flow {
    Ended,
    ConsumerGone,
}

/// Follows a job's log across disconnects
pub struct TailClient {
    http: HttpClient,
    reconnect_delay: Duration,
}

impl TailClient {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Stream entries of `job_id` strictly after `after`, or new ones only
    ///
    /// Runs until the returned receiver is dropped.
    pub fn follow(&self, job_id: &str, after: Option<Cursor>) -> mpsc::Receiver<LogEntry> {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(follow_loop(
            self.http.clone(),
            job_id.to_string(),
            CursorDedupe::new(after),
            self.reconnect_delay,
            tx,
        ));
        rx
    }
}

async fn follow_loop(
    http: HttpClient,
    job_id: String,
    mut dedupe: CursorDedupe,
    delay: Duration,
    tx: mpsc::Sender<LogEntry>,
) {
    loop {
        let from = dedupe.last().map(|c| c.to_string());
        match stream_once(&http, &job_id, from.as_deref(), &mut dedupe, &tx).await {
            Ok(Flow::ConsumerGone) => return,
            Ok(Flow::Ended) => info!("Tail of job {} ended, reconnecting", job_id),
            Err(e) => warn!("Tail of job {} failed: {}, reconnecting", job_id, e),
        }

        tokio::select! {
            _ = tx.closed() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn stream_once(
    http: &HttpClient,
    job_id: &str,
    from: Option<&str>,
    dedupe: &mut CursorDedupe,
    tx: &mpsc::Sender<LogEntry>,
) -> Result<Flow, ShipyardError> {
    let response = http.open_tail(job_id, from).await?;
    let mut body = response.bytes_stream();
    let mut parser = SseParser::new();

    loop {
        let chunk = tokio::select! {
            _ = tx.closed() => return Ok(Flow::ConsumerGone),
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else {
            return Ok(Flow::Ended);
        };

        for frame in parser.push(&chunk?) {
            let SseFrame::Data(data) = frame else {
                continue;
            };
            let event: TailEvent = match serde_json::from_str(&data) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Ignoring unreadable tail frame: {}", e);
                    continue;
                }
            };

            match event.kind {
                TailEventKind::Connected => debug!("Tail of job {} connected", job_id),
                TailEventKind::Error => warn!(
                    "Server reported tail error: {}",
                    event.message.unwrap_or_default()
                ),
                TailEventKind::Entry => {
                    let Some(entry) = event.data else {
                        continue;
                    };
                    if dedupe.accept(&entry.id) && tx.send(entry).await.is_err() {
                        return Ok(Flow::ConsumerGone);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_drops_replayed_cursors() {
        let mut dedupe = CursorDedupe::new(None);
        assert!(dedupe.accept("10-0"));
        assert!(dedupe.accept("10-1"));
        assert!(!dedupe.accept("10-1"));
        assert!(!dedupe.accept("9-5"));
        assert!(dedupe.accept("11-0"));
        assert!(!dedupe.accept("garbage"));
        assert_eq!(dedupe.last(), Some(Cursor::new(11, 0)));
    }

    #[test]
    fn test_dedupe_respects_starting_cursor() {
        let mut dedupe = CursorDedupe::new(Some(Cursor::new(5, 0)));
        assert!(!dedupe.accept("5-0"));
        assert!(dedupe.accept("5-1"));
    }
}
