//! Job log streams
//!
//! Each job has an append-only stream of log entries. Readers either fetch a
//! bounded history or follow the stream live through a tail; both are plain
//! reads, so any number of them can watch one job without sharing an offset.

use std::sync::Arc;
use std::time::Duration;

use shipyard_api::HistoryResponse;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::errors::ShipyardError;
use crate::store::{keys, Store};

pub mod cursor;
pub mod tail;

pub use cursor::{Cursor, TailStart};
pub use tail::TailFrame;

/// Stream read settings
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Most entries returned by one history read
    pub history_limit: usize,

    /// How long one blocking tail read waits
    pub block: Duration,

    /// Most entries taken per blocking read
    pub batch_size: usize,

    /// Interval between keep-alive frames
    pub heartbeat: Duration,

    /// Pause after a failed read before trying again
    pub retry_delay: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            block: Duration::from_secs(2),
            batch_size: 100,
            heartbeat: Duration::from_secs(30),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Read access to job log streams
#[derive(Clone)]
pub struct LogStreams {
    store: Arc<dyn Store>,
    options: StreamOptions,
    closing: Arc<watch::Sender<bool>>,
}

/// Shortest heartbeat and blocking read a tail runs with
const MIN_PERIOD: Duration = Duration::from_millis(1);

impl LogStreams {
    pub fn new(store: Arc<dyn Store>, mut options: StreamOptions) -> Self {
        // A zero interval panics and a zero block never returns
        options.heartbeat = options.heartbeat.max(MIN_PERIOD);
        options.block = options.block.max(MIN_PERIOD);
        let (closing, _) = watch::channel(false);
        Self {
            store,
            options,
            closing: Arc::new(closing),
        }
    }

    /// End every open tail, e.g. on shutdown
    ///
    /// Tails opened afterwards end right after their first frame.
    pub fn close(&self) {
        info!("Closing open log tails");
        self.closing.send_replace(true);
    }

    /// The first entries of a job's log, oldest first
    ///
    /// `lastId` is the cursor of the last returned entry, so a tail started
    /// from it continues without gap or overlap. An empty stream reports
    /// `0-0`.
    pub async fn history(&self, job_id: &str) -> Result<HistoryResponse, ShipyardError> {
        let records = self
            .store
            .log_range(&keys::job_stream(job_id), None, self.options.history_limit)
            .await?;
        let last_id = records.last().map(|r| r.id).unwrap_or(Cursor::ZERO);
        debug!("History of job {}: {} entries", job_id, records.len());

        Ok(HistoryResponse {
            entries: records.iter().map(|r| r.to_entry()).collect(),
            last_id: last_id.to_string(),
        })
    }

    /// Follow a job's log from `start`
    ///
    /// `$` is resolved to the stream's current last cursor before this
    /// returns, so every entry appended afterwards is delivered. Frames
    /// arrive on the returned channel until it is dropped, which stops the
    /// background reader.
    pub async fn tail(
        &self,
        job_id: &str,
        start: TailStart,
    ) -> Result<mpsc::Receiver<TailFrame>, ShipyardError> {
        let key = keys::job_stream(job_id);
        let cursor = match start {
            TailStart::After(cursor) => cursor,
            TailStart::Latest => self.store.log_last_id(&key).await?.unwrap_or(Cursor::ZERO),
        };
        debug!("Tail of job {} starts after {}", job_id, cursor);

        let (tx, rx) = mpsc::channel(self.options.batch_size.max(1));
        let follower = tail::Follower::new(self.store.clone(), key, cursor, self.options.clone());
        tokio::spawn(follower.run(tx, self.closing.subscribe()));
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::log::NewLogRecord;
    use crate::store::flaky::FlakyStore;
    use crate::store::MemoryStore;
    use shipyard_api::LogLevel;
    use tokio::time;

    fn options() -> StreamOptions {
        StreamOptions {
            block: Duration::from_millis(50),
            heartbeat: Duration::from_secs(60),
            ..Default::default()
        }
    }

    async fn next_line(rx: &mut mpsc::Receiver<TailFrame>) -> String {
        loop {
            match time::timeout(Duration::from_secs(5), rx.recv()).await {
                Ok(Some(TailFrame::Entry(record))) => return record.line,
                Ok(Some(_)) => continue,
                other => panic!("no entry: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_latest_delivers_entries_appended_right_after() {
        let store = Arc::new(MemoryStore::new());
        let key = keys::job_stream("job");
        store
            .log_append(&key, &NewLogRecord::new(LogLevel::Info, "old"))
            .await
            .unwrap();
        let streams = LogStreams::new(store.clone(), options());

        let mut rx = streams.tail("job", TailStart::Latest).await.unwrap();
        // No pause: the follower must not have to run first
        store
            .log_append(&key, &NewLogRecord::new(LogLevel::Info, "new"))
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(TailFrame::Connected));
        assert_eq!(next_line(&mut rx).await, "new");
    }

    #[tokio::test]
    async fn test_latest_on_empty_stream_starts_at_zero() {
        let store = Arc::new(MemoryStore::new());
        let streams = LogStreams::new(store.clone(), options());

        let mut rx = streams.tail("job", TailStart::Latest).await.unwrap();
        store
            .log_append(&keys::job_stream("job"), &NewLogRecord::new(LogLevel::Info, "first"))
            .await
            .unwrap();
        assert_eq!(next_line(&mut rx).await, "first");
    }

    #[tokio::test]
    async fn test_zero_periods_still_tail() {
        let store = Arc::new(MemoryStore::new());
        let streams = LogStreams::new(
            store.clone(),
            StreamOptions {
                heartbeat: Duration::ZERO,
                block: Duration::ZERO,
                ..Default::default()
            },
        );

        let mut rx = streams.tail("job", TailStart::Latest).await.unwrap();
        assert_eq!(rx.recv().await, Some(TailFrame::Connected));
        store
            .log_append(&keys::job_stream("job"), &NewLogRecord::new(LogLevel::Info, "alive"))
            .await
            .unwrap();
        assert_eq!(next_line(&mut rx).await, "alive");
    }

    #[tokio::test]
    async fn test_latest_lookup_failure_is_returned() {
        let store = Arc::new(FlakyStore::new(MemoryStore::new()));
        let streams = LogStreams::new(store.clone(), options());

        store.fail("log_last_id", 1);
        let err = streams.tail("job", TailStart::Latest).await.unwrap_err();
        assert!(matches!(err, ShipyardError::StoreError(_)));

        // An explicit cursor needs no lookup
        store.fail("log_last_id", 1);
        assert!(streams.tail("job", TailStart::After(Cursor::ZERO)).await.is_ok());
    }
}
