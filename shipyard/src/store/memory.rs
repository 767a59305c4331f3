//! In-process store
//!
//! Implements the same primitives as the Redis store for single-node runs and
//! tests. Every primitive takes the lock once, so each is atomic with respect
//! to the others, matching the guarantees of the shared store.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::errors::ShipyardError;
use crate::models::log::{LogRecord, NewLogRecord};
use crate::store::{LogReader, Store};
use crate::streams::cursor::Cursor;

#[derive(Default)]
struct Inner {
    lists: HashMap<String, VecDeque<String>>,
    logs: HashMap<String, Vec<LogRecord>>,
    values: HashMap<String, String>,
}

struct Shared {
    inner: Mutex<Inner>,
    appended: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn range_after(&self, key: &str, after: Option<Cursor>, count: usize) -> Vec<LogRecord> {
        let inner = self.lock();
        let Some(log) = inner.logs.get(key) else {
            return Vec::new();
        };
        let start = match after {
            Some(after) => log.partition_point(|record| record.id <= after),
            None => 0,
        };
        log[start..].iter().take(count).cloned().collect()
    }
}

/// Memory-backed [`Store`]
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                appended: Notify::new(),
            }),
        }
    }

    /// Set a plain value, e.g. a session marker
    pub fn insert_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.shared.lock().values.insert(key.into(), value.into());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_push_front(&self, key: &str, value: String) -> Result<(), ShipyardError> {
        let mut inner = self.shared.lock();
        inner.lists.entry(key.to_string()).or_default().push_front(value);
        Ok(())
    }

    async fn list_push_back(&self, key: &str, value: String) -> Result<(), ShipyardError> {
        let mut inner = self.shared.lock();
        inner.lists.entry(key.to_string()).or_default().push_back(value);
        Ok(())
    }

    async fn list_move_back(&self, from: &str, to: &str) -> Result<Option<String>, ShipyardError> {
        let mut inner = self.shared.lock();
        let Some(value) = inner.lists.get_mut(from).and_then(|list| list.pop_back()) else {
            return Ok(None);
        };
        inner
            .lists
            .entry(to.to_string())
            .or_default()
            .push_back(value.clone());
        Ok(Some(value))
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>, ShipyardError> {
        let inner = self.shared.lock();
        Ok(inner
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_replace(
        &self,
        from: &str,
        value: &str,
        to: &str,
        replacement: String,
    ) -> Result<usize, ShipyardError> {
        let mut inner = self.shared.lock();
        let removed = inner
            .lists
            .get_mut(from)
            .and_then(|list| {
                let index = list.iter().position(|item| item == value)?;
                list.remove(index)
            })
            .map_or(0, |_| 1);
        inner
            .lists
            .entry(to.to_string())
            .or_default()
            .push_back(replacement);
        Ok(removed)
    }

    async fn list_clear(&self, key: &str) -> Result<usize, ShipyardError> {
        let mut inner = self.shared.lock();
        Ok(inner.lists.remove(key).map(|list| list.len()).unwrap_or(0))
    }

    async fn value_get(&self, key: &str) -> Result<Option<String>, ShipyardError> {
        Ok(self.shared.lock().values.get(key).cloned())
    }

    async fn log_append(&self, key: &str, record: &NewLogRecord) -> Result<Cursor, ShipyardError> {
        let id = {
            let mut inner = self.shared.lock();
            let log = inner.logs.entry(key.to_string()).or_default();
            let last = log.last().map(|r| r.id).unwrap_or(Cursor::ZERO);
            let id = last.successor(now_millis());
            log.push(LogRecord {
                id,
                timestamp: record.timestamp.clone(),
                level: record.level,
                line: record.line.clone(),
            });
            id
        };
        self.shared.appended.notify_waiters();
        Ok(id)
    }

    async fn log_range(
        &self,
        key: &str,
        after: Option<Cursor>,
        count: usize,
    ) -> Result<Vec<LogRecord>, ShipyardError> {
        Ok(self.shared.range_after(key, after, count))
    }

    async fn log_last_id(&self, key: &str) -> Result<Option<Cursor>, ShipyardError> {
        let inner = self.shared.lock();
        Ok(inner.logs.get(key).and_then(|log| log.last()).map(|r| r.id))
    }

    async fn log_reader(&self) -> Result<Box<dyn LogReader>, ShipyardError> {
        Ok(Box::new(MemoryLogReader {
            shared: self.shared.clone(),
        }))
    }
}

/// Blocking reader over a [`MemoryStore`]
pub struct MemoryLogReader {
    shared: Arc<Shared>,
}

#[async_trait]
impl LogReader for MemoryLogReader {
    async fn read_after(
        &mut self,
        key: &str,
        after: Cursor,
        block: Duration,
        count: usize,
    ) -> Result<Vec<LogRecord>, ShipyardError> {
        let deadline = tokio::time::Instant::now() + block;
        loop {
            // Register interest before checking so an append in between is not missed
            let notified = self.shared.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let records = self.shared.range_after(key, Some(after), count);
            if !records.is_empty() {
                return Ok(records);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }
}
