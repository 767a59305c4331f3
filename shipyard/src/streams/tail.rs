//! Live tail of one job log stream

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::errors::ShipyardError;
use crate::models::log::LogRecord;
use crate::store::{LogReader, Store};
use crate::streams::cursor::Cursor;
use crate::streams::StreamOptions;

/// Frame produced by a tail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailFrame {
    /// Always the first frame
    Connected,

    /// A new log entry, in stream order
    Entry(LogRecord),

    /// A read failed; the tail retries on its own
    Error(String),

    /// Keep-alive
    Heartbeat,
}

/// Background reader feeding one tail consumer
pub(crate) struct Follower {
    store: Arc<dyn Store>,
    key: String,
    cursor: Cursor,
    reader: Option<Box<dyn LogReader>>,
    options: StreamOptions,
}

impl Follower {
    /// Follow `key` from entries strictly after `cursor`
    pub(crate) fn new(
        store: Arc<dyn Store>,
        key: String,
        cursor: Cursor,
        options: StreamOptions,
    ) -> Self {
        Self {
            store,
            key,
            cursor,
            reader: None,
            options,
        }
    }

    /// Next batch after the cursor, empty if the blocking read timed out
    async fn next_batch(&mut self) -> Result<Vec<LogRecord>, ShipyardError> {
        if self.reader.is_none() {
            self.reader = Some(self.store.log_reader().await?);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(Vec::new());
        };

        let result = reader
            .read_after(&self.key, self.cursor, self.options.block, self.options.batch_size)
            .await;
        match result {
            Ok(records) => {
                if let Some(last) = records.last() {
                    self.cursor = last.id;
                }
                Ok(records)
            }
            Err(e) => {
                // The connection may be broken; reopen on the next attempt
                self.reader = None;
                Err(e)
            }
        }
    }

    pub(crate) async fn run(
        mut self,
        tx: mpsc::Sender<TailFrame>,
        mut closing: watch::Receiver<bool>,
    ) {
        debug!("Tail opened on {} after {}", self.key, self.cursor);
        if tx.send(TailFrame::Connected).await.is_err() {
            return;
        }

        let period = self.options.heartbeat;
        let mut heartbeat = time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                true = server_closing(&mut closing) => {
                    debug!("Tail on {} closed by server", self.key);
                    return;
                }
                _ = heartbeat.tick() => {
                    if tx.send(TailFrame::Heartbeat).await.is_err() {
                        break;
                    }
                }
                result = self.next_batch() => match result {
                    Ok(records) => {
                        for record in records {
                            if tx.send(TailFrame::Entry(record)).await.is_err() {
                                debug!("Tail on {} closed by consumer", self.key);
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Tail read on {} failed: {}", self.key, e);
                        let frame = TailFrame::Error("Failed to read log stream, retrying".to_string());
                        if tx.send(frame).await.is_err() {
                            break;
                        }
                        tokio::select! {
                            _ = tx.closed() => break,
                            _ = time::sleep(self.options.retry_delay) => {}
                        }
                    }
                },
            }
        }

        debug!("Tail on {} closed by consumer", self.key);
    }
}

/// Resolves to `true` once the server starts closing tails
async fn server_closing(closing: &mut watch::Receiver<bool>) -> bool {
    closing.wait_for(|closed| *closed).await.is_ok()
}
